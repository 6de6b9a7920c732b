// src/bookmark/walker.rs
// =============================================================================
// This module walks a bookmark export and yields one Bookmark per anchor.
//
// How it works:
// 1. The first call to next() moves the input onto a blocking worker thread
// 2. That thread feeds the bytes through quick-xml, a streaming tokenizer
// 3. A tiny state machine watches for <A ...> ... </A> and builds a Bookmark
// 4. Each finished Bookmark is handed back through a one-slot channel, so the
//    scanner never runs more than one record ahead of the caller
//
// Why not parse the whole document into a DOM (like scraper does)?
// - Bookmark files can be huge (icons are inlined as base64)
// - We only need anchors, so token-level scanning is enough
//
// Rust concepts:
// - spawn_blocking: run synchronous I/O without stalling the async runtime
// - mpsc channels: hand values between threads without shared locks
// - CancellationToken: a cheap, cloneable "please stop" flag
// =============================================================================

use std::borrow::Cow;
use std::io::{BufRead, BufReader, Read};
use std::num::ParseIntError;

use async_trait::async_trait;
use chrono::DateTime;
use quick_xml::events::attributes::AttrError;
use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::Reader;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::Bookmark;

const ANCHOR_TAG: &[u8] = b"a";

/// Errors that end a walk. Each one is reported once, after which the walker
/// is exhausted.
#[derive(Debug, Error)]
pub enum WalkError {
    #[error("malformed bookmark markup near byte {position}: {source}")]
    Markup {
        position: u64,
        #[source]
        source: quick_xml::Error,
    },
    #[error("malformed anchor attribute near byte {position}: {source}")]
    Attribute {
        position: u64,
        #[source]
        source: AttrError,
    },
    #[error("invalid ADD_DATE {value:?}: {source}")]
    AddDate {
        value: String,
        #[source]
        source: ParseIntError,
    },
    #[error("ADD_DATE {0} is out of range")]
    AddDateOutOfRange(i64),
}

/// A pull-based source of bookmarks.
///
/// `next` returns `Ok(Some(_))` for each bookmark, `Ok(None)` once the input
/// is exhausted (and on every call after that), or `Err(_)` exactly once if
/// the walk failed. `stop` asks the walker to abandon the walk; later calls
/// to `next` eventually return `Ok(None)`.
#[async_trait]
pub trait Walker: Send {
    async fn next(&mut self) -> Result<Option<Bookmark>, WalkError>;

    fn stop(&self);
}

/// Walks a text stream in Netscape Bookmark File Format, assuming the stream
/// is UTF-8 encoded HTML.
pub struct NetscapeWalker {
    // Taken by the scanner thread on the first call to next()
    input: Option<Box<dyn BufRead + Send>>,
    walked: Option<mpsc::Receiver<Result<Bookmark, WalkError>>>,
    cancel: CancellationToken,
    exhausted: bool,
}

impl NetscapeWalker {
    /// Creates a walker over `input`. Nothing is read until the first call to
    /// `next`. Cancelling `cancel` (or calling `stop`) ends the walk.
    pub fn new<R>(input: R, cancel: CancellationToken) -> Self
    where
        R: Read + Send + 'static,
    {
        Self {
            input: Some(Box::new(BufReader::new(input))),
            walked: None,
            cancel,
            exhausted: false,
        }
    }

    fn start_scan(&mut self) -> Option<mpsc::Receiver<Result<Bookmark, WalkError>>> {
        let input = self.input.take()?;
        // A single slot: the scanner blocks until the caller pulls
        let (tx, rx) = mpsc::channel(1);
        let cancel = self.cancel.clone();

        debug!("starting bookmark scan");
        tokio::task::spawn_blocking(move || scan(Scanner::new(input), tx, cancel));

        Some(rx)
    }
}

#[async_trait]
impl Walker for NetscapeWalker {
    async fn next(&mut self) -> Result<Option<Bookmark>, WalkError> {
        if self.exhausted {
            return Ok(None);
        }
        if self.walked.is_none() {
            self.walked = self.start_scan();
        }
        let Some(walked) = self.walked.as_mut() else {
            self.exhausted = true;
            return Ok(None);
        };

        let item = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            item = walked.recv() => item,
        };

        match item {
            Some(Ok(bookmark)) => Ok(Some(bookmark)),
            Some(Err(error)) => {
                self.exhausted = true;
                Err(error)
            }
            None => {
                self.exhausted = true;
                Ok(None)
            }
        }
    }

    fn stop(&self) {
        self.cancel.cancel();
    }
}

// Runs on the blocking thread. Returns when the input ends, the walk fails,
// the receiver goes away, or the walk is cancelled.
fn scan<R: BufRead>(
    mut scanner: Scanner<R>,
    walked: mpsc::Sender<Result<Bookmark, WalkError>>,
    cancel: CancellationToken,
) {
    loop {
        let item = match scanner.next_bookmark(&cancel) {
            Ok(Some(bookmark)) => Ok(bookmark),
            Ok(None) => {
                debug!("bookmark scan finished");
                return;
            }
            Err(error) => Err(error),
        };
        let fatal = item.is_err();

        // Block this thread until the caller takes the item or gives up
        let delivered = futures::executor::block_on(async {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => false,
                sent = walked.send(item) => sent.is_ok(),
            }
        });

        if !delivered {
            debug!("bookmark scan abandoned");
            return;
        }
        if fatal {
            return;
        }
    }
}

/// The state machine over the token stream.
///
/// `current` is `Some` while the tokenizer is inside an anchor that will
/// produce a bookmark; text seen in that state is appended to the title.
struct Scanner<R> {
    reader: Reader<R>,
    buf: Vec<u8>,
    current: Option<Bookmark>,
}

impl<R: BufRead> Scanner<R> {
    fn new(input: R) -> Self {
        let mut reader = Reader::from_reader(input);
        // Bookmark exports are HTML, not XML: <DT> and <p> are never closed
        let config = reader.config_mut();
        config.check_end_names = false;
        config.allow_unmatched_ends = true;

        Self {
            reader,
            buf: Vec::new(),
            current: None,
        }
    }

    /// Advances to the next complete bookmark. Returns `Ok(None)` at the end
    /// of input or when cancelled.
    fn next_bookmark(&mut self, cancel: &CancellationToken) -> Result<Option<Bookmark>, WalkError> {
        loop {
            if cancel.is_cancelled() {
                return Ok(None);
            }

            self.buf.clear();
            let event = match self.reader.read_event_into(&mut self.buf) {
                Ok(event) => event,
                Err(source) => {
                    return Err(WalkError::Markup {
                        position: self.reader.buffer_position() as u64,
                        source,
                    })
                }
            };

            match event {
                Event::Start(ref tag) if is_anchor(tag) => {
                    let position = self.reader.buffer_position() as u64;
                    self.current = anchor_bookmark(tag, position)?;
                }
                // <A HREF="..."/> has no text, so it is complete right away
                Event::Empty(ref tag) if is_anchor(tag) => {
                    let position = self.reader.buffer_position() as u64;
                    if let Some(bookmark) = anchor_bookmark(tag, position)? {
                        return Ok(Some(bookmark));
                    }
                }
                Event::Text(ref text) => {
                    if let Some(bookmark) = self.current.as_mut() {
                        bookmark.title.push_str(&decode_text(text));
                    }
                }
                Event::End(ref tag) if tag.name().as_ref().eq_ignore_ascii_case(ANCHOR_TAG) => {
                    if let Some(mut bookmark) = self.current.take() {
                        bookmark.title = bookmark.title.trim().to_string();
                        return Ok(Some(bookmark));
                    }
                }
                Event::Eof => return Ok(None),
                _ => {}
            }
        }
    }
}

fn is_anchor(tag: &BytesStart<'_>) -> bool {
    tag.name().as_ref().eq_ignore_ascii_case(ANCHOR_TAG)
}

// Builds the bookmark for an anchor's attributes. An anchor without an href
// yields None; a bad ADD_DATE is fatal. A repeated attribute is ignored, the
// first one wins as in HTML.
fn anchor_bookmark(tag: &BytesStart<'_>, position: u64) -> Result<Option<Bookmark>, WalkError> {
    let mut url = None;
    let mut add_date = None;

    let mut attrs = tag.html_attributes();
    attrs.with_checks(false);
    for attr in attrs {
        let attr = attr.map_err(|source| WalkError::Attribute { position, source })?;
        let value = match attr.unescape_value() {
            Ok(value) => value,
            // Unknown HTML entities: keep the raw text
            Err(_) => Cow::Owned(String::from_utf8_lossy(&attr.value).into_owned()),
        };

        let key = attr.key.as_ref();
        if key.eq_ignore_ascii_case(b"href") && url.is_none() {
            url = Some(value.trim().to_string());
        } else if key.eq_ignore_ascii_case(b"add_date") && add_date.is_none() {
            add_date = Some(parse_add_date(&value)?);
        }
    }

    let Some(url) = url.filter(|url| !url.is_empty()) else {
        return Ok(None);
    };

    Ok(Some(Bookmark {
        url,
        title: String::new(),
        add_date,
    }))
}

fn parse_add_date(value: &str) -> Result<DateTime<chrono::Utc>, WalkError> {
    let seconds: i64 = value.parse().map_err(|source| WalkError::AddDate {
        value: value.to_string(),
        source,
    })?;
    DateTime::from_timestamp(seconds, 0).ok_or(WalkError::AddDateOutOfRange(seconds))
}

fn decode_text(text: &BytesText<'_>) -> String {
    match text.unescape() {
        Ok(decoded) => decoded.into_owned(),
        // "Fish & Chips" is fine in HTML but not a valid XML escape
        Err(_) => String::from_utf8_lossy(text).into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bookmark::testing::{InfiniteBookmarks, BOOKMARKS_HTML, MALFORMED_DATE_HTML};
    use std::time::Duration;

    async fn walk_all(walker: &mut NetscapeWalker) -> (Vec<Bookmark>, Vec<WalkError>) {
        let mut bookmarks = Vec::new();
        let mut errors = Vec::new();
        loop {
            match walker.next().await {
                Ok(Some(bookmark)) => bookmarks.push(bookmark),
                Ok(None) => break,
                Err(error) => errors.push(error),
            }
        }
        (bookmarks, errors)
    }

    fn at(seconds: i64) -> Option<DateTime<chrono::Utc>> {
        DateTime::from_timestamp(seconds, 0)
    }

    #[tokio::test]
    async fn test_walks_nested_folders() {
        let mut walker = NetscapeWalker::new(BOOKMARKS_HTML.as_bytes(), CancellationToken::new());
        let (bookmarks, errors) = walk_all(&mut walker).await;

        assert!(errors.is_empty());
        assert_eq!(
            bookmarks,
            vec![
                Bookmark {
                    url: "https://bar.io/".to_string(),
                    title: "Bar".to_string(),
                    add_date: at(1515361177),
                },
                Bookmark {
                    url: "https://qux.io/".to_string(),
                    title: "Qux".to_string(),
                    add_date: at(1515361177),
                },
                Bookmark {
                    url: "https://bee.io/".to_string(),
                    title: "Bee".to_string(),
                    add_date: at(1515361173),
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_document_is_exhausted_repeatedly() {
        let doc = "<!DOCTYPE NETSCAPE-Bookmark-file-1>\n<TITLE>Bookmarks</TITLE>\n";
        let mut walker = NetscapeWalker::new(doc.as_bytes(), CancellationToken::new());

        for _ in 0..3 {
            assert!(matches!(walker.next().await, Ok(None)));
        }
    }

    #[tokio::test]
    async fn test_malformed_add_date_ends_the_walk() {
        let cancel = CancellationToken::new();
        let mut walker = NetscapeWalker::new(MALFORMED_DATE_HTML.as_bytes(), cancel);

        let first = walker.next().await.unwrap().unwrap();
        assert_eq!(first.url, "https://bar.io/");

        let error = walker.next().await.unwrap_err();
        assert!(matches!(error, WalkError::AddDate { ref value, .. } if value == "junkie"));

        // The bookmark after the bad one is never produced
        assert!(matches!(walker.next().await, Ok(None)));
        assert!(matches!(walker.next().await, Ok(None)));
    }

    #[tokio::test]
    async fn test_skips_anchors_without_href() {
        let doc = r#"<DL><p>
            <DT><A NAME="top">Top</A>
            <DT><A HREF="">Empty</A>
            <DT><A HREF="https://rust-lang.org/">Rust</A>
        </DL>"#;
        let mut walker = NetscapeWalker::new(doc.as_bytes(), CancellationToken::new());
        let (bookmarks, errors) = walk_all(&mut walker).await;

        assert!(errors.is_empty());
        assert_eq!(bookmarks.len(), 1);
        assert_eq!(bookmarks[0].title, "Rust");
        assert_eq!(bookmarks[0].add_date, None);
    }

    #[tokio::test]
    async fn test_unescapes_href_and_keeps_raw_ampersands_in_title() {
        let doc = r#"<DT><a href="https://example.com/?a=1&amp;b=2">Fish & Chips</a>"#;
        let mut walker = NetscapeWalker::new(doc.as_bytes(), CancellationToken::new());

        let bookmark = walker.next().await.unwrap().unwrap();
        assert_eq!(bookmark.url, "https://example.com/?a=1&b=2");
        assert_eq!(bookmark.title, "Fish & Chips");
    }

    #[tokio::test]
    async fn test_repeated_attributes_keep_the_first() {
        let doc = r#"<DT><A HREF="https://a.io/" ADD_DATE="1515361177" HREF="https://b.io/" ADD_DATE="x">A</A>"#;
        let mut walker = NetscapeWalker::new(doc.as_bytes(), CancellationToken::new());
        let (bookmarks, errors) = walk_all(&mut walker).await;

        assert!(errors.is_empty());
        assert_eq!(bookmarks.len(), 1);
        assert_eq!(bookmarks[0].url, "https://a.io/");
        assert_eq!(bookmarks[0].add_date, at(1515361177));
    }

    async fn assert_markup_error_ends_walk(doc: &'static str) {
        let mut walker = NetscapeWalker::new(doc.as_bytes(), CancellationToken::new());

        let first = walker.next().await.unwrap().unwrap();
        assert_eq!(first.url, "https://a.io/");

        let error = walker.next().await.unwrap_err();
        assert!(matches!(error, WalkError::Markup { .. }), "unexpected error: {error}");

        for _ in 0..3 {
            assert!(matches!(walker.next().await, Ok(None)));
        }
    }

    #[tokio::test]
    async fn test_unclosed_tag_ends_the_walk() {
        assert_markup_error_ends_walk(
            "<DL><p>\n<DT><A HREF=\"https://a.io/\">A</A>\n<DT><A HREF=\"https://b.io/ >B</A>\n</DL><p>\n",
        )
        .await;
    }

    #[tokio::test]
    async fn test_unterminated_comment_ends_the_walk() {
        assert_markup_error_ends_walk(
            "<DL><p>\n<DT><A HREF=\"https://a.io/\">A</A>\n<!-- never closed\n<DT><A HREF=\"https://b.io/\">B</A>\n",
        )
        .await;
    }

    #[tokio::test]
    async fn test_stop_before_first_pull() {
        let mut walker = NetscapeWalker::new(BOOKMARKS_HTML.as_bytes(), CancellationToken::new());
        walker.stop();

        assert!(matches!(walker.next().await, Ok(None)));
    }

    #[tokio::test]
    async fn test_stop_abandons_endless_input() {
        let cancel = CancellationToken::new();
        let mut walker = NetscapeWalker::new(InfiniteBookmarks::default(), cancel);
        assert!(walker.next().await.unwrap().is_some());
        assert!(walker.next().await.unwrap().is_some());

        walker.stop();

        let next = tokio::time::timeout(Duration::from_secs(1), walker.next())
            .await
            .expect("walker should stop promptly");
        assert!(matches!(next, Ok(None)));
    }
}
