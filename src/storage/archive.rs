use flate2::write::GzEncoder;
use flate2::Compression;
use std::io;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

type Chunk = Result<Vec<u8>, io::Error>;

/// `std::io::Write` adapter feeding a bounded channel from a blocking task.
struct ChannelWriter {
    tx: mpsc::Sender<Chunk>,
}

impl io::Write for ChannelWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let len = buf.len();
        match self.tx.blocking_send(Ok(buf.to_vec())) {
            Ok(_) => Ok(len),
            Err(_) => Err(io::Error::new(io::ErrorKind::BrokenPipe, "Channel closed")),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Stream `dir` as a gzip-compressed tar archive rooted at `name`.
///
/// Dot-prefixed entries and symlinks are left out, matching what listings
/// show. The archive is built on a blocking thread; an error part-way through
/// is sent down the channel and ends the stream.
pub fn stream_tar_gz(dir: PathBuf, name: String) -> mpsc::Receiver<Chunk> {
    let (tx, rx) = mpsc::channel::<Chunk>(10);
    let tx_err = tx.clone();

    tokio::task::spawn_blocking(move || {
        let writer = ChannelWriter { tx };
        if let Err(e) = write_tar_gz(writer, &dir, Path::new(&name)) {
            tracing::error!(path = %dir.display(), error = %e, "Failed to build archive");
            let _ = tx_err.blocking_send(Err(e));
        }
    });

    rx
}

fn write_tar_gz<W: io::Write>(writer: W, dir: &Path, name: &Path) -> io::Result<()> {
    let mut enc = GzEncoder::new(writer, Compression::default());
    {
        let mut tar = tar::Builder::new(&mut enc);
        tar.follow_symlinks(false);
        append_visible(&mut tar, dir, name)?;
        tar.finish()?;
    }
    enc.finish()?;
    Ok(())
}

fn append_visible<W: io::Write>(
    tar: &mut tar::Builder<W>,
    dir: &Path,
    name: &Path,
) -> io::Result<()> {
    tar.append_dir(name, dir)?;

    let mut entries: Vec<_> = std::fs::read_dir(dir)?.collect::<Result<_, _>>()?;
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let file_name = entry.file_name();
        if file_name.to_string_lossy().starts_with('.') {
            continue;
        }

        let file_type = entry.file_type()?;
        let archived = name.join(&file_name);
        if file_type.is_dir() {
            append_visible(tar, &entry.path(), &archived)?;
        } else if file_type.is_file() {
            tar.append_path_with_name(entry.path(), &archived)?;
        }
    }
    Ok(())
}
