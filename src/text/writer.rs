//! Writes aligned `(token, status, token)` triples, one sentence per block.

use crate::core::types::NormalizedSentence;
use crate::error::Result;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

pub struct PairWriter<W: Write> {
    out: W,
    sentences: usize,
}

impl PairWriter<BufWriter<File>> {
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        Ok(PairWriter::new(BufWriter::new(File::create(path)?)))
    }
}

impl<W: Write> PairWriter<W> {
    pub fn new(out: W) -> Self {
        PairWriter { out, sentences: 0 }
    }

    /// One `raw<TAB>status<TAB>normalized` line per token, then a blank line.
    pub fn write_sentence(&mut self, sentence: &NormalizedSentence) -> Result<()> {
        for pair in &sentence.pairs {
            writeln!(self.out, "{}\t{}\t{}", pair.raw, pair.status, pair.normalized)?;
        }
        writeln!(self.out)?;
        self.sentences += 1;
        Ok(())
    }

    pub fn sentences(&self) -> usize {
        self.sentences
    }

    pub fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Mode, TokenPair};

    #[test]
    fn test_sentence_block() {
        let sentence = NormalizedSentence {
            mode: Mode::Clean,
            pairs: vec![
                TokenPair::new("i", "i"),
                TokenPair::new("goin", "going"),
                TokenPair::new("home", "home"),
            ],
            changes: Vec::new(),
            confidence: -1.0,
        };
        let mut writer = PairWriter::new(Vec::new());
        writer.write_sentence(&sentence).unwrap();
        writer.write_sentence(&sentence).unwrap();
        assert_eq!(writer.sentences(), 2);

        let text = String::from_utf8(writer.into_inner()).unwrap();
        let block = "i\tIV\ti\ngoin\tOOV\tgoing\nhome\tIV\thome\n\n";
        assert_eq!(text, format!("{block}{block}"));
    }

    #[test]
    fn test_create_makes_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("clean.tsv");
        let mut writer = PairWriter::create(&path).unwrap();
        writer.flush().unwrap();
        assert!(path.exists());
    }
}
