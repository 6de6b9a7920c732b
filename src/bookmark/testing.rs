// src/bookmark/testing.rs
// Shared fixtures for tests that need bookmark documents.

use std::io::{self, Read};

pub(crate) const BOOKMARKS_HTML: &str = r#"<!DOCTYPE NETSCAPE-Bookmark-file-1>
<!-- This is an automatically generated file.
     It will be read and overwritten.
     DO NOT EDIT! -->
<META HTTP-EQUIV="Content-Type" CONTENT="text/html; charset=UTF-8">
<TITLE>Bookmarks</TITLE>
<H1>Bookmarks</H1>
<DL><p>
    <DT><H3 ADD_DATE="1512790922" LAST_MODIFIED="1588537285" PERSONAL_TOOLBAR_FOLDER="true">FooDir</H3>
    <DL><p>
        <DT><A HREF="https://bar.io/" ADD_DATE="1515361177" ICON="data:image/png;base64,blah==">Bar</A>
        <DT><H3 ADD_DATE="1515126229" LAST_MODIFIED="1592885828">BarDir</H3>
        <DL><p>
            <DT><A HREF="https://qux.io/" ADD_DATE="1515361177" ICON="data:image/png;base64,blah==">Qux</A>
            <DT><H3 ADD_DATE="1516481807" LAST_MODIFIED="1573835459">Qux Dir</H3>
            <DL><p>
                <DT><A HREF="https://bee.io/" ADD_DATE="1515361173" ICON="data:image/png;base64,blahblah==">Bee</A>
            </DL><p>
        </DL><p>
    </DL><p>
</DL><p>
"#;

pub(crate) const MALFORMED_DATE_HTML: &str = r#"<!DOCTYPE NETSCAPE-Bookmark-file-1>
<TITLE>Bookmarks</TITLE>
<H1>Bookmarks</H1>
<DL><p>
    <DT><A HREF="https://bar.io/" ADD_DATE="1515361177">Bar</A>
    <DT><A HREF="https://qux.io/" ADD_DATE="junkie">Qux</A>
    <DT><A HREF="https://bee.io/" ADD_DATE="1515361173">Bee</A>
</DL><p>
"#;

/// Renders a bookmark document with `urls` as anchors.
pub(crate) fn bookmarks_for(urls: &[String]) -> String {
    let mut doc = String::from("<!DOCTYPE NETSCAPE-Bookmark-file-1>\n<DL><p>\n");
    for (i, url) in urls.iter().enumerate() {
        doc.push_str(&format!(
            "    <DT><A HREF=\"{url}\" ADD_DATE=\"{}\">Bookmark {i}</A>\n",
            1515361177 + i
        ));
    }
    doc.push_str("</DL><p>\n");
    doc
}

/// A reader that never runs out of anchors.
#[derive(Default)]
pub(crate) struct InfiniteBookmarks {
    pending: Vec<u8>,
    served: usize,
}

impl Read for InfiniteBookmarks {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pending.is_empty() {
            self.pending = format!(
                "<DT><A HREF=\"https://example.com/{n}\" ADD_DATE=\"1515361177\">Example {n}</A>\n",
                n = self.served
            )
            .into_bytes();
            self.served += 1;
        }
        let n = buf.len().min(self.pending.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.drain(..n);
        Ok(n)
    }
}
