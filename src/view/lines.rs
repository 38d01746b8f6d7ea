//! Line access for preview documents.
//!
//! Small documents are split up front. Large ones get a [`LazyLineParser`],
//! which indexes line starts once and materializes lines on demand.
use crate::cache::{BoundedCache, EvictionPolicy};
use parking_lot::Mutex;
use std::sync::Arc;

pub struct LazyLineParser {
    text: Arc<str>,
    starts: Vec<usize>,
    memo: Mutex<BoundedCache<usize, Arc<str>>>,
}

impl LazyLineParser {
    pub fn new(text: Arc<str>, memo_capacity: usize) -> Self {
        let bytes = text.as_bytes();
        let mut starts = Vec::with_capacity(bytes.len() / 40 + 1);
        if !bytes.is_empty() {
            starts.push(0);
            starts.extend(memchr::memchr_iter(b'\n', bytes).map(|i| i + 1));
            if bytes.last() == Some(&b'\n') {
                starts.pop();
            }
        }

        Self {
            text,
            starts,
            memo: Mutex::new(BoundedCache::new(memo_capacity, EvictionPolicy::Fifo)),
        }
    }

    pub fn line_count(&self) -> usize {
        self.starts.len()
    }

    /// Lines `start..end`, clamped to the document.
    pub fn get_lines(&self, start: usize, end: usize) -> Vec<Arc<str>> {
        let end = end.min(self.line_count());
        (start.min(end)..end).map(|index| self.line(index)).collect()
    }

    fn line(&self, index: usize) -> Arc<str> {
        let cached = self.memo.lock().get(&index).cloned();
        if let Some(line) = cached {
            return line;
        }

        let from = self.starts[index];
        let (to, terminated) = match self.starts.get(index + 1) {
            Some(next) => (next - 1, true),
            None if self.text.ends_with('\n') => (self.text.len() - 1, true),
            None => (self.text.len(), false),
        };
        let mut line = &self.text[from..to];
        if terminated {
            line = line.strip_suffix('\r').unwrap_or(line);
        }
        let line: Arc<str> = Arc::from(line);

        self.memo.lock().insert(index, Arc::clone(&line));
        line
    }

    pub fn memoized(&self) -> usize {
        self.memo.lock().len()
    }
}

pub enum LineSource {
    Eager(Vec<Arc<str>>),
    Lazy(LazyLineParser),
}

impl LineSource {
    /// Indexes lazily when `text` is larger than `lazy_threshold` bytes.
    pub fn new(text: Arc<str>, lazy_threshold: usize, memo_capacity: usize) -> Self {
        if text.len() > lazy_threshold {
            LineSource::Lazy(LazyLineParser::new(text, memo_capacity))
        } else {
            LineSource::Eager(text.lines().map(Arc::from).collect())
        }
    }

    pub fn line_count(&self) -> usize {
        match self {
            LineSource::Eager(lines) => lines.len(),
            LineSource::Lazy(parser) => parser.line_count(),
        }
    }

    pub fn get_lines(&self, start: usize, end: usize) -> Vec<Arc<str>> {
        match self {
            LineSource::Eager(lines) => {
                let end = end.min(lines.len());
                lines[start.min(end)..end].to_vec()
            }
            LineSource::Lazy(parser) => parser.get_lines(start, end),
        }
    }

    pub fn is_lazy(&self) -> bool {
        matches!(self, LineSource::Lazy(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn owned(lines: Vec<Arc<str>>) -> Vec<String> {
        lines.iter().map(|l| l.to_string()).collect()
    }

    #[test]
    fn test_lazy_lines_match_str_lines() {
        let parser = LazyLineParser::new(Arc::from("one\r\ntwo\n\nfour\n"), 8);
        assert_eq!(parser.line_count(), 4);
        assert_eq!(owned(parser.get_lines(0, 10)), vec!["one", "two", "", "four"]);
        assert_eq!(owned(parser.get_lines(3, 2)), Vec::<String>::new());
    }

    #[test]
    fn test_memo_is_capped() {
        let text: String = (0..100).map(|i| format!("line {i}\n")).collect();
        let parser = LazyLineParser::new(Arc::from(text), 10);

        parser.get_lines(0, 50);
        assert_eq!(parser.memoized(), 10);
        assert_eq!(&*parser.get_lines(7, 8)[0], "line 7");
    }

    #[test]
    fn test_source_picks_strategy_by_size() {
        let small = LineSource::new(Arc::from("a\nb"), 1024, 16);
        assert!(!small.is_lazy());
        assert_eq!(small.line_count(), 2);

        let large = LineSource::new(Arc::from("x\n".repeat(1000)), 1024, 16);
        assert!(large.is_lazy());
        assert_eq!(large.line_count(), 1000);
    }

    proptest! {
        #[test]
        fn prop_lazy_and_eager_agree(text in "[a-c\\n\\r]{0,200}", start in 0usize..60, len in 0usize..60) {
            let text: Arc<str> = Arc::from(text);
            let eager = LineSource::new(Arc::clone(&text), usize::MAX, 16);
            let lazy = LineSource::new(text, 0, 16);
            prop_assert_eq!(eager.line_count(), lazy.line_count());
            prop_assert_eq!(
                owned(eager.get_lines(start, start + len)),
                owned(lazy.get_lines(start, start + len))
            );
        }
    }
}
