//! Interactive prompts
//!
//! Each prompt loops until the core validator accepts the answer. End of
//! input cancels the prompt.

use combiner_core::{parse_header_line, resolve_selection, Column, ColumnSpec, SOURCE_COLUMN};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use thiserror::Error;

/// Reason a folder number was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FolderChoiceRejection {
    /// Answer is not a whole number
    #[error("please enter a valid number")]
    NotANumber,

    /// Number is outside `1..=max`
    #[error("please enter a number between 1 and {max}")]
    OutOfRange { max: usize },
}

/// Validate a 1-based folder number, returning the 0-based index
pub fn parse_folder_choice(input: &str, count: usize) -> Result<usize, FolderChoiceRejection> {
    let choice: usize = input
        .trim()
        .parse()
        .map_err(|_| FolderChoiceRejection::NotANumber)?;
    if choice < 1 || choice > count {
        return Err(FolderChoiceRejection::OutOfRange { max: count });
    }
    Ok(choice - 1)
}

pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Print a question and read one answer line; `None` at end of input
    fn ask(&mut self, question: &str) -> io::Result<Option<String>> {
        write!(self.output, "\n{}", question)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            writeln!(self.output)?;
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    pub fn choose_folder(&mut self, folders: &[PathBuf]) -> io::Result<Option<PathBuf>> {
        writeln!(self.output, "\nAvailable folders:")?;
        for (i, folder) in folders.iter().enumerate() {
            let name = folder
                .file_name()
                .map(|n| n.to_string_lossy())
                .unwrap_or_default();
            writeln!(self.output, "{}. {}", i + 1, name)?;
        }

        loop {
            let Some(answer) = self.ask("Enter folder number: ")? else {
                return Ok(None);
            };
            match parse_folder_choice(&answer, folders.len()) {
                Ok(idx) => return Ok(Some(folders[idx].clone())),
                Err(reason) => writeln!(self.output, "{}", reason)?,
            }
        }
    }

    pub fn show_preview(&mut self, file_name: &str, lines: &[String]) -> io::Result<()> {
        writeln!(
            self.output,
            "\nRaw preview of first {} lines from {}:",
            lines.len(),
            file_name
        )?;
        for (i, line) in lines.iter().enumerate() {
            writeln!(self.output, "Line {}: {}", i + 1, line)?;
        }
        Ok(())
    }

    pub fn header_line(&mut self, preview_len: usize) -> io::Result<Option<usize>> {
        loop {
            let Some(answer) =
                self.ask("Which line contains the headers? (0 for no headers): ")?
            else {
                return Ok(None);
            };
            match parse_header_line(&answer, preview_len) {
                Ok(line) => return Ok(Some(line)),
                Err(reason) => writeln!(self.output, "{}", reason)?,
            }
        }
    }

    pub fn column_selection(&mut self, columns: &[Column]) -> io::Result<Option<ColumnSpec>> {
        writeln!(self.output, "\nColumn Selection")?;
        writeln!(self.output, "----------------")?;
        writeln!(self.output, "Available columns:")?;
        for col in columns {
            writeln!(self.output, "{}. {}", col.index + 1, col.name)?;
        }
        writeln!(self.output, "\nOptions:")?;
        writeln!(self.output, "- Column numbers separated by commas (e.g. '1,3,5')")?;
        writeln!(self.output, "- Ranges with a dash (e.g. '1-3,5,7-9')")?;
        writeln!(self.output, "- Columns appear in the order given; repeats are kept")?;
        writeln!(self.output, "- 'all' for every column in original order (default)")?;
        writeln!(self.output, "- 'none' for only {}", SOURCE_COLUMN)?;

        loop {
            let Some(answer) = self.ask("Enter your selection: ")? else {
                return Ok(None);
            };
            match resolve_selection(&answer, columns) {
                Ok(spec) => {
                    self.describe_selection(&spec)?;
                    return Ok(Some(spec));
                }
                Err(reason) => writeln!(self.output, "{}", reason)?,
            }
        }
    }

    fn describe_selection(&mut self, spec: &ColumnSpec) -> io::Result<()> {
        match spec {
            ColumnSpec::All => writeln!(self.output, "Including all columns in original order."),
            ColumnSpec::Names(names) => {
                writeln!(self.output, "Selected columns in order: {}", names.join(", "))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn prompter(input: &str) -> Prompter<Cursor<Vec<u8>>, Vec<u8>> {
        Prompter::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    fn printed(p: &Prompter<Cursor<Vec<u8>>, Vec<u8>>) -> String {
        String::from_utf8_lossy(&p.output).into_owned()
    }

    #[test]
    fn test_parse_folder_choice() {
        assert_eq!(parse_folder_choice("2", 3), Ok(1));
        assert_eq!(
            parse_folder_choice("4", 3),
            Err(FolderChoiceRejection::OutOfRange { max: 3 })
        );
        assert_eq!(
            parse_folder_choice("0", 3),
            Err(FolderChoiceRejection::OutOfRange { max: 3 })
        );
        assert_eq!(
            parse_folder_choice("x", 3),
            Err(FolderChoiceRejection::NotANumber)
        );
    }

    #[test]
    fn test_choose_folder_retries_until_valid() {
        let folders = vec![PathBuf::from("CSV-Files/a"), PathBuf::from("CSV-Files/b")];
        let mut p = prompter("9\nabc\n2\n");

        let chosen = p.choose_folder(&folders).unwrap();

        assert_eq!(chosen, Some(PathBuf::from("CSV-Files/b")));
        let out = printed(&p);
        assert!(out.contains("1. a"));
        assert!(out.contains("between 1 and 2"));
        assert!(out.contains("valid number"));
    }

    #[test]
    fn test_header_line_empty_means_none() {
        let mut p = prompter("\n");
        assert_eq!(p.header_line(10).unwrap(), Some(0));
    }

    #[test]
    fn test_header_line_retries() {
        let mut p = prompter("11\n3\n");
        assert_eq!(p.header_line(10).unwrap(), Some(3));
        assert!(printed(&p).contains("between 0 and 10"));
    }

    #[test]
    fn test_end_of_input_cancels() {
        let mut p = prompter("");
        assert_eq!(p.header_line(10).unwrap(), None);

        let mut p = prompter("bad\n");
        assert_eq!(p.choose_folder(&[PathBuf::from("a")]).unwrap(), None);
    }

    #[test]
    fn test_column_selection() {
        let columns = Column::from_names([SOURCE_COLUMN, "id", "name", "ts"]);
        let mut p = prompter("2-9\n3,2\n");

        let spec = p.column_selection(&columns).unwrap();

        assert_eq!(spec, Some(ColumnSpec::names(["name", "id"])));
        let out = printed(&p);
        assert!(out.contains("4. ts"));
        assert!(out.contains("invalid range: 2-9"));
        assert!(out.contains("Selected columns in order: Source_File, name, id"));
    }

    #[test]
    fn test_column_selection_default_all() {
        let columns = Column::from_names([SOURCE_COLUMN, "id"]);
        let mut p = prompter("\n");
        assert_eq!(p.column_selection(&columns).unwrap(), Some(ColumnSpec::All));
    }
}
