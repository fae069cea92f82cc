//! Vocabularies of zipped Protocol Buffer bundles
//!
//! The archive is scanned line by line: messages become schemas, their fields
//! become properties, rpcs become operations, and the fields of each rpc's
//! request message become parameters. Declarations are expected one per line,
//! as `protoc`-style formatting produces.

use super::{read_bounded, Analyzer, Vocabulary, VocabularyBuilder, MAX_DOCUMENT_BYTES};
use crate::error::{RegistryError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::io::Cursor;
use zip::ZipArchive;

static BLOCK_COMMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)/\*.*?\*/").expect("block comment pattern compiles"));

static MESSAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*message\s+(\w+)\s*\{").expect("message pattern compiles"));

static FIELD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:repeated\s+|optional\s+|required\s+)?(?:map\s*<[^>]+>|[\w.]+)\s+(\w+)\s*=\s*\d+")
        .expect("field pattern compiles")
});

static RPC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*rpc\s+(\w+)\s*\(\s*(?:stream\s+)?([\w.]+)\s*\)")
        .expect("rpc pattern compiles")
});

#[derive(Default)]
struct ProtoScan {
    fields: HashMap<String, Vec<String>>,
    requests: Vec<String>,
}

impl ProtoScan {
    fn scan(&mut self, builder: &mut VocabularyBuilder, source: &str) {
        let source = BLOCK_COMMENT.replace_all(source, "");
        // One entry per open brace: the message it opened, if any
        let mut blocks: Vec<Option<String>> = Vec::new();

        for raw in source.lines() {
            let line = raw.split("//").next().unwrap_or_default();
            let opened = MESSAGE.captures(line).map(|caps| caps[1].to_string());

            if let Some(message) = &opened {
                builder.schema(message);
            } else if let Some(caps) = RPC.captures(line) {
                builder.operation(&caps[1]);
                let request = caps[2].rsplit('.').next().unwrap_or_default();
                self.requests.push(request.to_string());
            } else if let Some(caps) = FIELD.captures(line) {
                let current = blocks.iter().rev().find_map(|b| b.as_ref());
                if let Some(message) = current {
                    builder.property(&caps[1]);
                    self.fields
                        .entry(message.clone())
                        .or_default()
                        .push(caps[1].to_string());
                }
            }

            let mut opened = opened;
            for c in line.chars() {
                match c {
                    '{' => blocks.push(opened.take()),
                    '}' => {
                        blocks.pop();
                    }
                    _ => {}
                }
            }
        }
    }

    fn finish(self, builder: &mut VocabularyBuilder) {
        for request in &self.requests {
            for field in self.fields.get(request).into_iter().flatten() {
                builder.parameter(field);
            }
        }
    }
}

/// `proto+zip` bundles
pub struct ZippedProtosAnalyzer {
    /// Cap on the uncompressed size of all `.proto` entries together
    limit: u64,
}

impl ZippedProtosAnalyzer {
    pub fn with_limit(limit: u64) -> Self {
        Self { limit }
    }
}

impl Default for ZippedProtosAnalyzer {
    fn default() -> Self {
        Self::with_limit(MAX_DOCUMENT_BYTES)
    }
}

impl Analyzer for ZippedProtosAnalyzer {
    fn name(&self) -> &str {
        "proto+zip"
    }

    fn analyze(&self, contents: &[u8]) -> Result<Vocabulary> {
        let mut archive = ZipArchive::new(Cursor::new(contents))
            .map_err(|e| RegistryError::invalid(format!("invalid zip archive: {}", e)))?;

        let mut builder = VocabularyBuilder::new();
        let mut scan = ProtoScan::default();
        let mut found = 0;
        let mut remaining = self.limit;
        for i in 0..archive.len() {
            let mut file = archive
                .by_index(i)
                .map_err(|e| RegistryError::invalid(format!("failed to read zip entry {}: {}", i, e)))?;
            if file.is_dir() || !file.name().ends_with(".proto") {
                continue;
            }
            let entry = file.name().to_string();
            let bytes = read_bounded(&mut file, remaining, &format!("zip entry {}", entry))?;
            remaining -= bytes.len() as u64;
            scan.scan(&mut builder, &String::from_utf8_lossy(&bytes));
            found += 1;
        }

        if found == 0 {
            return Err(RegistryError::invalid(
                "zip archive contains no .proto files",
            ));
        }
        scan.finish(&mut builder);
        Ok(builder.build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    const LIBRARY_PROTO: &str = r#"
syntax = "proto3";
package google.example.library.v1;

// A library service.
service LibraryService {
  rpc GetBook(GetBookRequest) returns (Book);
  rpc ListBooks(ListBooksRequest) returns (stream Book); /* streamed */
}

message Book {
  string name = 1;
  string author = 2;
  map<string, string> labels = 3;
  enum Format {
    FORMAT_UNSPECIFIED = 0;
    HARDCOVER = 1;
  }
  Format format = 4;
}

message GetBookRequest {
  string name = 1;
}

message ListBooksRequest {
  int32 page_size = 1;
  string page_token = 2;
}
"#;

    fn zipped(files: &[(&str, &str)]) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
        for (name, body) in files {
            zip.start_file(*name, options).unwrap();
            zip.write_all(body.as_bytes()).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn test_zipped_protos_vocabulary() {
        let bundle = zipped(&[("library.proto", LIBRARY_PROTO), ("README.md", "# docs")]);
        let vocabulary = ZippedProtosAnalyzer::default().analyze(&bundle).unwrap();

        let words = |counts: &[crate::analyzers::WordCount]| -> Vec<String> {
            counts.iter().map(|w| w.word.clone()).collect()
        };
        assert_eq!(
            words(&vocabulary.schemas),
            vec!["Book", "GetBookRequest", "ListBooksRequest"]
        );
        assert_eq!(words(&vocabulary.operations), vec!["GetBook", "ListBooks"]);
        assert_eq!(
            words(&vocabulary.properties),
            vec!["author", "format", "labels", "name", "page_size", "page_token"]
        );
        assert_eq!(
            words(&vocabulary.parameters),
            vec!["name", "page_size", "page_token"]
        );
    }

    #[test]
    fn test_entries_past_the_size_cap_are_rejected() {
        let padding = "// filler\n".repeat(1000);
        let body = format!("{}{}", LIBRARY_PROTO, padding);
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        zip.start_file("a.proto", options).unwrap();
        zip.write_all(body.as_bytes()).unwrap();
        zip.start_file("b.proto", options).unwrap();
        zip.write_all(body.as_bytes()).unwrap();
        let bundle = zip.finish().unwrap().into_inner();
        assert!(bundle.len() < body.len());

        let err = ZippedProtosAnalyzer::with_limit(body.len() as u64)
            .analyze(&bundle)
            .unwrap_err();
        assert!(matches!(err, RegistryError::InvalidArgument(_)));
        let err = ZippedProtosAnalyzer::with_limit(100)
            .analyze(&bundle)
            .unwrap_err();
        assert!(matches!(err, RegistryError::InvalidArgument(_)));

        ZippedProtosAnalyzer::with_limit(2 * body.len() as u64)
            .analyze(&bundle)
            .unwrap();
    }

    #[test]
    fn test_rejects_bad_archives() {
        assert!(ZippedProtosAnalyzer::default().analyze(b"not a zip").is_err());
        let empty = zipped(&[("README.md", "nothing here")]);
        assert!(ZippedProtosAnalyzer::default().analyze(&empty).is_err());
    }
}
