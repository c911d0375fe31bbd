//! ZIP archive helpers for Office Open XML packages.
//! Reading side looks up parts case-insensitively, writing side adds whole parts.

use crate::error::DataSweeperError;
use crate::helpers::xml::XmlReader;
use std::io::BufReader;
use std::io::Read;
use std::io::Seek;
use std::io::Write;
use zip::read::ZipFile;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::CompressionMethod;
use zip::ZipArchive;
use zip::ZipWriter;

/// Helper trait for reading parts out of a package
pub(crate) trait ZipHelper<RS: Read + Seek> {
    /// Gets a part by name (case-insensitive, path separator agnostic)
    fn file(&'_ mut self, name: &str) -> Result<Option<ZipFile<'_, RS>>, DataSweeperError>;

    /// Creates an XML reader for a part
    fn xml_reader(
        &'_ mut self,
        name: &str,
    ) -> Result<Option<XmlReader<BufReader<ZipFile<'_, RS>>>>, DataSweeperError>;
}

impl<RS: Read + Seek> ZipHelper<RS> for ZipArchive<RS> {
    fn file(&'_ mut self, name: &str) -> Result<Option<ZipFile<'_, RS>>, DataSweeperError> {
        let pattern = name.replace('\\', "/");
        let path = self.file_names()
            .find(|file_name| pattern.eq_ignore_ascii_case(*file_name))
            .map(|file_name| file_name.to_owned());
        match path.map(|file_name| self.by_name(&file_name)).transpose() {
            Ok(Some(file)) => Ok(Some(file)),
            Ok(None) | Err(ZipError::FileNotFound) => Ok(None),
            Err(error) => Err(error)?,
        }
    }

    fn xml_reader(
        &'_ mut self,
        name: &str,
    ) -> Result<Option<XmlReader<BufReader<ZipFile<'_, RS>>>>, DataSweeperError> {
        let reader = self
            .file(name)?
            .map(|file| XmlReader::new(BufReader::new(file)));
        Ok(reader)
    }
}

/// Helper trait for adding parts to a package
pub(crate) trait ZipWriterHelper {
    /// Adds a deflated part with the given content
    fn add_part(&mut self, name: &str, content: &[u8]) -> Result<(), DataSweeperError>;
}

impl<W: Write + Seek> ZipWriterHelper for ZipWriter<W> {
    fn add_part(&mut self, name: &str, content: &[u8]) -> Result<(), DataSweeperError> {
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        self.start_file(name, options)?;
        self.write_all(content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn parts_round_trip_case_insensitive() -> Result<(), DataSweeperError> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        writer.add_part("xl/workbook.xml", b"<workbook/>")?;
        let bytes = writer.finish()?.into_inner();

        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let mut content = String::new();
        archive.file("XL\\Workbook.xml")?
            .expect("part exists")
            .read_to_string(&mut content)?;
        assert_eq!(content, "<workbook/>");
        assert!(archive.file("xl/missing.xml")?.is_none());
        Ok(())
    }
}
