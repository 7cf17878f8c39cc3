//! Database
//!
//! Named database holding the current snapshot. Queries bind to the snapshot
//! returned by `data()`; `add` builds a successor snapshot under the update
//! lock and swaps it in, after which expressions compiled against the old
//! snapshot report `StoreUnavailable`.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

use memchr::memrchr;

use crate::data::{Data, NodeStore, NodeTable, Pre, UpdateLock};
use crate::error::{UpdateError, UpdateResult};
use crate::options::Options;

/// Named database with a swappable snapshot
#[derive(Debug)]
pub struct Database {
    name: String,
    options: Options,
    current: RwLock<Arc<Data>>,
    lock: UpdateLock,
}

impl Database {
    /// Create an empty database
    pub fn create(name: &str, options: Options) -> UpdateResult<Self> {
        if name.is_empty() || name.contains(['/', '\\']) {
            return Err(UpdateError::NameInvalid(name.to_string()));
        }
        let data = Data::new(name, NodeTable::new(), &options);
        log::debug!("created database \"{}\"", name);
        Ok(Database {
            name: name.to_string(),
            options,
            current: RwLock::new(Arc::new(data)),
            lock: UpdateLock::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Current snapshot
    pub fn data(&self) -> Arc<Data> {
        let current = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&current)
    }

    /// Update lock guarding structural changes
    pub fn lock(&self) -> &UpdateLock {
        &self.lock
    }

    /// Add a document fragment under `path`.
    ///
    /// The file name defaults to the fragment's document name. Fragments
    /// without content are skipped. Returns an info message.
    pub fn add(&self, path: &str, fragment: &NodeTable) -> UpdateResult<String> {
        let start = Instant::now();
        let path = normalize(path)?;
        let (target, name) = match memrchr(b'/', path.as_bytes()) {
            Some(slash) => (&path[..=slash], &path[slash + 1..]),
            None => ("", path.as_str()),
        };
        let name = if name.is_empty() {
            fragment_name(fragment)
        } else {
            name.to_string()
        };
        if name.is_empty() {
            return Err(UpdateError::NameInvalid(path.clone()));
        }
        let doc = format!("{}{}", target, name);

        if fragment.len() > 1 {
            let guard = self
                .lock
                .try_acquire()
                .ok_or_else(|| UpdateError::Busy(self.name.clone()))?;

            let old = self.data();
            let mut table = old.table().clone();
            let root = table.len();
            table.append(fragment);
            table.set_value(root as Pre, doc.as_bytes());
            let data = Arc::new(Data::new(&self.name, table, &self.options));

            *self.current.write().unwrap_or_else(PoisonError::into_inner) = data;
            guard.release();
        } else {
            log::debug!("skipping empty fragment \"{}\"", doc);
        }

        let message = format!("Path \"{}\" added in {:.2} ms.", name, millis(start));
        log::info!("{}: {}", self.name, message);
        Ok(message)
    }
}

/// Normalize a database path: forward slashes, no duplicate or leading slashes
fn normalize(path: &str) -> UpdateResult<String> {
    let path = path.replace('\\', "/");
    let mut segments = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" => continue,
            "." | ".." => return Err(UpdateError::NameInvalid(path.clone())),
            _ => segments.push(segment),
        }
    }
    let mut normalized = segments.join("/");
    if path.ends_with('/') && !normalized.is_empty() {
        normalized.push('/');
    }
    Ok(normalized)
}

/// Document name stored in the fragment's root node
fn fragment_name(fragment: &NodeTable) -> String {
    if fragment.is_empty() {
        return String::new();
    }
    let value = fragment.text(0, true);
    let name = match memrchr(b'/', value) {
        Some(slash) => &value[slash + 1..],
        None => value,
    };
    String::from_utf8_lossy(name).into_owned()
}

fn millis(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{NodeKind, TableBuilder};
    use crate::error::ErrorKind;
    use crate::query::{Expr, QueryContext};

    fn fragment(name: &str, text: &str) -> NodeTable {
        let mut builder = TableBuilder::new(name);
        builder.open_elem(b"note");
        builder.text(text.as_bytes());
        builder.close_elem().unwrap();
        builder.finish().unwrap()
    }

    #[test]
    fn test_add_documents() {
        let db = Database::create("db", Options::default()).unwrap();
        let message = db.add("notes/a.xml", &fragment("in.xml", "hello")).unwrap();
        assert!(message.starts_with("Path \"a.xml\" added in "));
        db.add("notes/", &fragment("dir/b.xml", "world")).unwrap();

        let data = db.data();
        let docs: Vec<_> = data.table().documents().collect();
        assert_eq!(docs, vec![0, 3]);
        assert_eq!(data.store().kind(3), NodeKind::Document);
        assert_eq!(data.store().text(0, true), b"notes/a.xml");
        assert_eq!(data.store().text(3, true), b"notes/b.xml");

        let hits = Expr::text(&data, b"world").value(&QueryContext::new()).unwrap();
        assert_eq!(hits.pres(), vec![5]);
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("\\a\\\\b/c.xml").unwrap(), "a/b/c.xml");
        assert_eq!(normalize("//dir//").unwrap(), "dir/");
        assert_eq!(normalize("").unwrap(), "");
        assert!(matches!(normalize("a/../b"), Err(UpdateError::NameInvalid(_))));
        assert!(matches!(normalize("./b"), Err(UpdateError::NameInvalid(_))));
    }

    #[test]
    fn test_invalid_names() {
        let db = Database::create("db", Options::default()).unwrap();
        let nameless = fragment("", "text");
        assert!(matches!(db.add("dir/", &nameless), Err(UpdateError::NameInvalid(_))));
        assert!(matches!(db.add("a/../x.xml", &nameless), Err(UpdateError::NameInvalid(_))));
        assert!(Database::create("a/b", Options::default()).is_err());
    }

    #[test]
    fn test_empty_fragment_skipped() {
        let db = Database::create("db", Options::default()).unwrap();
        let before = db.data();
        let empty = TableBuilder::new("empty.xml").finish().unwrap();
        db.add("empty.xml", &empty).unwrap();
        assert!(Arc::ptr_eq(&before, &db.data()));
    }

    #[test]
    fn test_busy_while_locked() {
        let db = Database::create("db", Options::default()).unwrap();
        let guard = db.lock().try_acquire().unwrap();
        let err = db.add("a.xml", &fragment("a.xml", "x")).unwrap_err();
        assert!(matches!(err, UpdateError::Busy(ref name) if name == "db"));
        drop(guard);

        db.add("a.xml", &fragment("a.xml", "x")).unwrap();
        assert!(!db.lock().is_held());
    }

    #[test]
    fn test_store_unavailable_after_add() {
        let db = Database::create("db", Options::default()).unwrap();
        db.add("a.xml", &fragment("a.xml", "x")).unwrap();
        let expr = Expr::text(&db.data(), b"x");
        let qc = QueryContext::new();
        assert_eq!(expr.value(&qc).unwrap().len(), 1);

        db.add("b.xml", &fragment("b.xml", "x")).unwrap();
        let err = expr.value(&qc).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StoreUnavailable);
        assert_eq!(Expr::text(&db.data(), b"x").value(&qc).unwrap().len(), 2);
    }
}
