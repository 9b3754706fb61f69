use flate2::read::GzDecoder;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Write, stdin, stdout};
use std::path::Path;

/// Open `path` for buffered reading; `-` reads stdin.
pub fn xopen(path: &Path) -> Result<Box<dyn BufRead>, io::Error> {
    if path.to_str() == Some("-") {
        return Ok(Box::new(BufReader::new(stdin())));
    }

    let file = OpenOptions::new().read(true).open(path)?;
    Ok(Box::new(BufReader::new(file)))
}

/// Like [`xopen`], decompressing `.gz` files on the fly.
pub fn xzopen(path: &Path) -> Result<Box<dyn BufRead>, io::Error> {
    if path.extension().and_then(|s| s.to_str()) == Some("gz") {
        let file = OpenOptions::new().read(true).open(path)?;
        Ok(Box::new(BufReader::new(GzDecoder::new(file))))
    } else {
        xopen(path)
    }
}

/// Buffered writer for `path`, or stdout when no path (or `-`) is given.
pub fn xcreate(path: Option<&Path>) -> Result<Box<dyn Write + Send>, io::Error> {
    match path {
        Some(p) if p.to_str() != Some("-") => {
            let file = File::create(p)?;
            Ok(Box::new(BufWriter::new(file)))
        }
        _ => Ok(Box::new(BufWriter::new(stdout()))),
    }
}
