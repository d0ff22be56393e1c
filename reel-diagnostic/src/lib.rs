#[cfg(test)]
mod test;

use std::{
    collections::HashMap,
    fmt::Write as FmtWrite,
    fs::File,
    io::{self, BufRead, BufReader, Write as IoWrite},
    path::PathBuf,
};

#[derive(PartialEq, Eq, Debug, Hash, Clone)]
pub enum Source {
    File { path: PathBuf },
    Interactive { label: String },
}

impl Source {
    pub fn to_str(&self) -> &str {
        match self {
            Source::File { path } => path.to_str().unwrap_or("<non-utf8 path>"),
            Source::Interactive { label } => label,
        }
    }
}

#[derive(PartialEq, Eq, Debug, Hash, Clone, Copy)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

#[derive(PartialEq, Eq, Debug, Hash, Clone)]
pub struct Location {
    pub source: Source,
    pub position: Option<Position>,
}

#[derive(PartialEq, Eq, Debug, Hash, Clone)]
pub struct Message {
    pub content: String,
    pub addendum: Option<String>,
}

#[derive(Default)]
pub struct Diagnostic {
    items: Vec<Message>,
    located_items: Vec<(Location, Message)>,
}

impl Diagnostic {
    pub fn new() -> Self {
        Diagnostic {
            items: Vec::new(),
            located_items: Vec::new(),
        }
    }

    pub fn item(&mut self, location: Option<Location>, message: Message) {
        match location {
            None => self.items.push(message),
            Some(location) => {
                match self
                    .located_items
                    .binary_search_by_key(&location.position.map(|p| (p.line, p.column)), |i| {
                        i.0.position.map(|p| (p.line, p.column))
                    }) {
                    Err(ix) => self.located_items.insert(ix, (location, message)),
                    Ok(ix) => self.located_items.insert(ix + 1, (location, message)),
                }
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.located_items.is_empty()
    }

    pub fn report_error_heading(path: &str, position: Option<Position>, message: &str) -> String {
        let mut str = String::from(path);
        str.push(':');
        if let Some(position) = position {
            let _ = write!(str, "{}:{}:", position.line, position.column);
        }
        str.push(' ');
        str.push_str("error: ");
        str.push_str(message);
        str
    }

    pub fn report_located_message(
        line: usize,
        column: usize,
        path: &str,
        line_str: &str,
        message: &Message,
    ) -> String {
        let mut result = String::new();
        let caret: String = {
            let mut caret: String = " ".repeat(column.saturating_sub(1));
            caret.push('^');
            caret
        };
        let line1 =
            Self::report_error_heading(path, Some(Position { line, column }), &message.content);
        let pad_amount = ((line as f32).log(10.0).floor() as usize) + 1;
        let padding: String = " ".repeat(pad_amount);

        let line2 = format!("{} |", padding);
        let line3 = format!("{} | {}", line, line_str);
        let line4 = format!("{} | {}", padding, caret);

        result.push_str(&line1);
        result.push('\n');
        result.push_str(&line2);
        result.push('\n');
        result.push_str(&line3);
        result.push('\n');
        result.push_str(&line4);
        if let Some(addendum) = &message.addendum {
            result.push('\n');
            result.push_str(addendum.as_str());
        }
        result
    }

    /// Render every item in source order. Located items in readable files get
    /// the offending line and a caret; anything else falls back to a heading.
    pub fn render_all(self) -> io::Result<Vec<String>> {
        struct FileEntry {
            file: BufReader<File>,
            line_str: String,
            line: usize,
        }

        let mut rendered = Vec::with_capacity(self.items.len() + self.located_items.len());

        for message in self.items {
            let mut result = format!("error: {}", message.content);
            if let Some(addendum) = &message.addendum {
                result.push('\n');
                result.push_str(addendum);
            }
            rendered.push(result);
        }

        let mut files: HashMap<PathBuf, FileEntry> = HashMap::new();
        for (location, message) in self.located_items.into_iter() {
            let result = match (&location.source, location.position) {
                (Source::File { path }, Some(position)) => {
                    if !files.contains_key(path) {
                        match File::open(path) {
                            Ok(file) => {
                                files.insert(
                                    path.clone(),
                                    FileEntry {
                                        file: BufReader::new(file),
                                        line_str: String::new(),
                                        line: 0,
                                    },
                                );
                            }
                            Err(_) => {
                                rendered.push(Self::report_error_heading(
                                    location.source.to_str(),
                                    Some(position),
                                    &message.content,
                                ));
                                continue;
                            }
                        }
                    }
                    let entry = match files.get_mut(path) {
                        Some(entry) => entry,
                        None => continue,
                    };
                    // Items are sorted by position, so the file only ever moves forward.
                    while entry.line < position.line {
                        entry.line_str.clear();
                        if entry.file.read_line(&mut entry.line_str)? == 0 {
                            break;
                        }
                        entry.line += 1;
                    }
                    if entry.line == position.line {
                        Self::report_located_message(
                            position.line,
                            position.column,
                            location.source.to_str(),
                            entry.line_str.trim_end_matches('\n'),
                            &message,
                        )
                    } else {
                        Self::report_error_heading(
                            location.source.to_str(),
                            Some(position),
                            &message.content,
                        )
                    }
                }
                (source, position) => {
                    Self::report_error_heading(source.to_str(), position, &message.content)
                }
            };
            rendered.push(result);
        }
        Ok(rendered)
    }

    pub fn report_all(self) -> io::Result<()> {
        let mut stderr = io::stderr();
        for result in self.render_all()? {
            stderr.write_all(result.as_bytes())?;
            stderr.write_all(b"\n")?;
        }
        Ok(())
    }
}
