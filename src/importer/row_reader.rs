// ==========================================
// 商品目录导入系统 - 源文件读取
// ==========================================
// 职责: 将表格源文件解析为按表头键控的有序行数据
// 规则:
// - 表头与值去除首尾空白
// - 完全空白的记录跳过
// - 记录长度与表头不一致视为结构性错误
// - 非空表头重复视为结构性错误
// ==========================================

use crate::domain::import_job::RowData;
use crate::importer::error::{ImportError, ImportResult};
use csv::ReaderBuilder;
use std::fs::File;
use std::path::Path;

// ==========================================
// ParsedTable - 解析结果
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct ParsedTable {
    pub headers: Vec<String>,
    pub records: Vec<RowData>,
}

impl ParsedTable {
    /// 返回 required 中不在表头里的列
    pub fn missing_columns(&self, required: &[&str]) -> Vec<String> {
        required
            .iter()
            .filter(|col| !self.headers.iter().any(|h| h == *col))
            .map(|col| col.to_string())
            .collect()
    }
}

// ==========================================
// RowReader Trait
// ==========================================
pub trait RowReader: Send + Sync {
    /// 全量解析源文件
    fn read(&self, source: &Path) -> ImportResult<ParsedTable>;
}

// ==========================================
// CsvRowReader
// ==========================================
#[derive(Debug, Clone, Copy)]
pub struct CsvRowReader {
    delimiter: u8,
}

impl Default for CsvRowReader {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

impl CsvRowReader {
    pub fn new(delimiter: u8) -> Self {
        Self { delimiter }
    }
}

impl RowReader for CsvRowReader {
    fn read(&self, source: &Path) -> ImportResult<ParsedTable> {
        if !source.is_file() {
            return Err(ImportError::FileNotFound(source.display().to_string()));
        }

        let file = File::open(source)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .delimiter(self.delimiter)
            .flexible(false)
            .from_reader(file);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        if headers.iter().all(|h| h.is_empty()) {
            return Err(ImportError::EmptySource(source.display().to_string()));
        }

        if let Some(duplicate) = duplicate_header(&headers) {
            return Err(ImportError::CsvParseError(format!("重复的表头: {}", duplicate)));
        }

        let mut records = Vec::new();
        for result in reader.records() {
            let record = result?;

            if record.iter().all(|v| v.trim().is_empty()) {
                continue;
            }

            let data: RowData = headers
                .iter()
                .zip(record.iter())
                .filter(|(header, _)| !header.is_empty())
                .map(|(header, value)| (header.clone(), value.trim().to_string()))
                .collect();
            records.push(data);
        }

        Ok(ParsedTable { headers, records })
    }
}

/// 第一个重复出现的非空表头
fn duplicate_header(headers: &[String]) -> Option<&str> {
    headers
        .iter()
        .enumerate()
        .filter(|(_, h)| !h.is_empty())
        .find(|(i, h)| headers[..*i].contains(*h))
        .map(|(_, h)| h.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn csv_file(content: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_read_trims_and_skips_blank_records() {
        let file = csv_file(b" email , first_name\na@example.com, Ada \n,\nb@example.com,Bob\n");

        let table = CsvRowReader::default().read(file.path()).unwrap();

        assert_eq!(table.headers, vec!["email", "first_name"]);
        assert_eq!(table.records.len(), 2);
        assert_eq!(table.records[0].get("first_name"), Some("Ada"));
        assert_eq!(table.records[1].get("email"), Some("b@example.com"));
        assert_eq!(table.records[0].columns().collect::<Vec<_>>(), vec!["email", "first_name"]);
    }

    #[test]
    fn test_read_custom_delimiter() {
        let file = csv_file(b"handle;title\ntee;Tee Shirt\n");

        let table = CsvRowReader::new(b';').read(file.path()).unwrap();

        assert_eq!(table.records[0].get("title"), Some("Tee Shirt"));
    }

    #[test]
    fn test_missing_file() {
        let result = CsvRowReader::default().read(Path::new("/nonexistent/rows.csv"));
        assert!(matches!(result, Err(ImportError::FileNotFound(_))));
    }

    #[test]
    fn test_empty_file_has_no_header() {
        let file = csv_file(b"");
        let result = CsvRowReader::default().read(file.path());
        assert!(matches!(result, Err(ImportError::EmptySource(_))));
    }

    #[test]
    fn test_ragged_record_is_structural_error() {
        let file = csv_file(b"email,first_name\na@example.com,Ada,extra\n");
        let result = CsvRowReader::default().read(file.path());
        assert!(matches!(result, Err(ImportError::CsvParseError(_))));
    }

    #[test]
    fn test_duplicate_header_is_structural_error() {
        let file = csv_file(b"email, email ,first_name
a@example.com,b@example.com,Ada
");
        let result = CsvRowReader::default().read(file.path());
        match result {
            Err(ImportError::CsvParseError(message)) => assert!(message.contains("email")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_repeated_blank_headers_are_ignored() {
        let file = csv_file(b"email,,
a@example.com,x,y
");
        let table = CsvRowReader::default().read(file.path()).unwrap();
        assert_eq!(table.records[0].columns().collect::<Vec<_>>(), vec!["email"]);
    }

    #[test]
    fn test_invalid_utf8_is_structural_error() {
        let file = csv_file(b"email\n\xff\xfe@example.com\n");
        let result = CsvRowReader::default().read(file.path());
        assert!(matches!(result, Err(ImportError::CsvParseError(_))));
    }

    #[test]
    fn test_missing_columns() {
        let table = ParsedTable {
            headers: vec!["title".to_string()],
            records: vec![],
        };
        assert_eq!(table.missing_columns(&["handle", "title"]), vec!["handle"]);
    }
}
