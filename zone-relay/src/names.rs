//! Имена контента для уведомлений.
//!
//! Настоящий справочник игровых данных внешний; здесь только шов под него и
//! простая таблица из файла вида `id = name` (по строке на запись, `#` комментарии).

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

pub(crate) trait ContentNames: Send + Sync {
    fn content_name(&self, content_id: u16) -> Option<String>;
}

/// Никаких имён не знает, уведомления показывают `content #id`
pub(crate) struct NoContentNames;

impl ContentNames for NoContentNames {
    fn content_name(&self, _content_id: u16) -> Option<String> {
        None
    }
}

#[derive(Debug, Default)]
pub(crate) struct ContentTable {
    names: HashMap<u16, String>,
}

impl ContentTable {
    pub(crate) fn len(&self) -> usize {
        self.names.len()
    }
}

impl ContentNames for ContentTable {
    fn content_name(&self, content_id: u16) -> Option<String> {
        self.names.get(&content_id).cloned()
    }
}

/// Имя для уведомления с запасным вариантом
pub(crate) fn display_name(names: &dyn ContentNames, content_id: u16) -> String {
    names
        .content_name(content_id)
        .unwrap_or_else(|| format!("content #{content_id}"))
}

/// Строки без `=` или с нечисловым id пропускаются
pub(crate) fn read_content_names<R: io::Read>(reader: R) -> io::Result<ContentTable> {
    let mut names = HashMap::new();

    for line in BufReader::new(reader).lines() {
        let line = line?;
        if let Some((id, name)) = parse_line(&line) {
            names.insert(id, name);
        }
    }

    Ok(ContentTable { names })
}

pub(crate) fn read_content_names_from_path(path: impl AsRef<Path>) -> io::Result<ContentTable> {
    read_content_names(File::open(path)?)
}

fn parse_line(line: &str) -> Option<(u16, String)> {
    let s = line.split('#').next().unwrap_or("").trim();
    let (id, name) = s.split_once('=')?;
    let id = id.trim().parse().ok()?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((id, name.to_string()))
}
