//! HLS playlist rewriting
//!
//! Every URI a playlist references is turned into a link back through the
//! proxy, so the player fetches segments, keys and variant playlists via the
//! gateway instead of hitting the origin directly.

use url::Url;
use vodgate_core::encoding::encode_uri_component;

/// Media type served for rewritten playlists
pub const PLAYLIST_CONTENT_TYPE: &str = "application/vnd.apple.mpegurl";

const PLAYLIST_EXTENSION: &str = ".m3u8";

const URI_ATTRIBUTE: &str = "URI=\"";

/// Whether an upstream response should be treated as a text playlist.
#[must_use]
pub fn is_playlist(target: &Url, content_type: &str) -> bool {
    target.path().to_ascii_lowercase().ends_with(PLAYLIST_EXTENSION)
        || content_type.to_ascii_lowercase().contains("mpegurl")
}

/// Rewrite URLs inside a playlist so they proxy through `proxy_base`.
///
/// URI lines and `URI="..."` attributes are resolved against `base` and
/// replaced by `{proxy_base}?url={encoded}`. Tags, comments, blank lines and
/// line terminators are kept as they are. References that do not resolve are
/// left untouched.
#[must_use]
pub fn rewrite_playlist(playlist: &str, base: &Url, proxy_base: &str) -> String {
    let mut output = String::with_capacity(playlist.len() + playlist.len() / 2);

    for line in playlist.split_inclusive('\n') {
        let (content, terminator) = split_terminator(line);

        if content.starts_with('#') {
            output.push_str(&rewrite_uri_attributes(content, base, proxy_base));
        } else if content.trim().is_empty() {
            output.push_str(content);
        } else {
            match proxied(content.trim(), base, proxy_base) {
                Some(link) => output.push_str(&link),
                None => output.push_str(content),
            }
        }

        output.push_str(terminator);
    }

    output
}

/// Proxied link for one reference, `None` if it cannot be resolved
#[must_use]
pub fn proxied(reference: &str, base: &Url, proxy_base: &str) -> Option<String> {
    let absolute = base.join(reference).ok()?;
    Some(format!(
        "{proxy_base}?url={}",
        encode_uri_component(absolute.as_str())
    ))
}

fn split_terminator(line: &str) -> (&str, &str) {
    if let Some(content) = line.strip_suffix("\r\n") {
        (content, "\r\n")
    } else if let Some(content) = line.strip_suffix('\n') {
        (content, "\n")
    } else {
        (line, "")
    }
}

/// Rewrite any non-empty `URI="..."` values found in a tag line.
fn rewrite_uri_attributes(line: &str, base: &Url, proxy_base: &str) -> String {
    let mut result = String::with_capacity(line.len());
    let mut remaining = line;

    while let Some(start) = remaining.find(URI_ATTRIBUTE) {
        let value_start = start + URI_ATTRIBUTE.len();
        result.push_str(&remaining[..value_start]);
        remaining = &remaining[value_start..];

        let Some(end) = remaining.find('"') else {
            // unterminated attribute, nothing more to rewrite
            break;
        };

        let uri = &remaining[..end];
        match proxied(uri, base, proxy_base).filter(|_| !uri.is_empty()) {
            Some(link) => result.push_str(&link),
            None => result.push_str(uri),
        }
        result.push('"');
        remaining = &remaining[end + 1..];
    }

    result.push_str(remaining);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROXY: &str = "https://gw.example/api/cors";

    fn base() -> Url {
        Url::parse("https://h/a/master.m3u8").unwrap()
    }

    #[test]
    fn test_relative_segment_is_proxied() {
        let out = rewrite_playlist("seg-001.ts\n", &base(), PROXY);
        assert_eq!(
            out,
            "https://gw.example/api/cors?url=https%3A%2F%2Fh%2Fa%2Fseg-001.ts\n"
        );
    }

    #[test]
    fn test_absolute_and_root_relative_segments() {
        let out = rewrite_playlist(
            "https://cdn.example/v/1.ts\n/root/2.ts\n../up/3.ts",
            &base(),
            PROXY,
        );
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines[0], format!("{PROXY}?url=https%3A%2F%2Fcdn.example%2Fv%2F1.ts"));
        assert_eq!(lines[1], format!("{PROXY}?url=https%3A%2F%2Fh%2Froot%2F2.ts"));
        assert_eq!(lines[2], format!("{PROXY}?url=https%3A%2F%2Fh%2Fup%2F3.ts"));
        // no terminator is invented for the last line
        assert!(!out.ends_with('\n'));
    }

    #[test]
    fn test_key_uri_attribute_keeps_surrounding_syntax() {
        let out = rewrite_playlist(
            "#EXT-X-KEY:METHOD=AES-128,URI=\"key.bin\",IV=0x1234\n",
            &base(),
            PROXY,
        );
        assert_eq!(
            out,
            "#EXT-X-KEY:METHOD=AES-128,URI=\"https://gw.example/api/cors?url=https%3A%2F%2Fh%2Fa%2Fkey.bin\",IV=0x1234\n"
        );
    }

    #[test]
    fn test_multiple_uri_attributes_on_one_line() {
        let out = rewrite_uri_attributes(
            "#EXT-X-MEDIA:TYPE=AUDIO,URI=\"a/en.m3u8\",X-ALT=1,URI=\"b.m3u8\"",
            &base(),
            PROXY,
        );
        assert_eq!(out.matches("cors?url=").count(), 2);
        assert!(out.contains("url=https%3A%2F%2Fh%2Fa%2Fa%2Fen.m3u8\""));
        assert!(out.contains("url=https%3A%2F%2Fh%2Fa%2Fb.m3u8\""));
        assert!(out.contains(",X-ALT=1,"));
    }

    #[test]
    fn test_empty_and_unterminated_attributes_are_left_alone() {
        let line = "#EXT-X-KEY:METHOD=NONE,URI=\"\"";
        assert_eq!(rewrite_uri_attributes(line, &base(), PROXY), line);

        let broken = "#EXT-X-KEY:URI=\"key.bin";
        assert_eq!(rewrite_uri_attributes(broken, &base(), PROXY), broken);
    }

    #[test]
    fn test_comments_and_blank_lines_untouched() {
        let input = "#EXTM3U\n#EXT-X-VERSION:3\n\n#EXTINF:10.0,\nseg.ts\n   \n#EXT-X-ENDLIST\n";
        let out = rewrite_playlist(input, &base(), PROXY);
        let lines: Vec<_> = out.split('\n').collect();

        assert_eq!(lines[0], "#EXTM3U");
        assert_eq!(lines[1], "#EXT-X-VERSION:3");
        assert_eq!(lines[2], "");
        assert_eq!(lines[3], "#EXTINF:10.0,");
        assert!(lines[4].starts_with(PROXY));
        assert_eq!(lines[5], "   ");
        assert_eq!(lines[6], "#EXT-X-ENDLIST");
        assert_eq!(lines[7], "");
    }

    #[test]
    fn test_crlf_terminators_preserved() {
        let out = rewrite_playlist("#EXTM3U\r\nseg.ts\r\n", &base(), PROXY);
        assert_eq!(
            out,
            format!("#EXTM3U\r\n{PROXY}?url=https%3A%2F%2Fh%2Fa%2Fseg.ts\r\n")
        );
    }

    #[test]
    fn test_rewritten_line_decodes_back_to_target() {
        let line = "sub/dir/seg 1.ts?token=a&b=c";
        let out = rewrite_playlist(line, &base(), PROXY);

        let expected_target = base().join(line).unwrap();
        assert_eq!(
            out,
            format!("{PROXY}?url={}", encode_uri_component(expected_target.as_str()))
        );

        let proxied = Url::parse(&out).unwrap();
        let (_, decoded) = proxied
            .query_pairs()
            .find(|(k, _)| k == "url")
            .unwrap();
        assert_eq!(decoded, expected_target.as_str());
    }

    #[test]
    fn test_unresolvable_reference_kept() {
        let out = rewrite_playlist("http://[broken\n", &base(), PROXY);
        assert_eq!(out, "http://[broken\n");
    }

    #[test]
    fn test_is_playlist() {
        let m3u8 = Url::parse("https://h/live/INDEX.M3U8?token=1").unwrap();
        let ts = Url::parse("https://h/live/seg.ts").unwrap();
        let lookalike = Url::parse("https://h/file.m3u8.bak").unwrap();

        assert!(is_playlist(&m3u8, ""));
        assert!(is_playlist(&ts, "application/x-mpegURL"));
        assert!(is_playlist(&ts, "audio/mpegurl; charset=utf-8"));
        assert!(!is_playlist(&ts, "video/mp2t"));
        assert!(!is_playlist(&lookalike, "application/octet-stream"));
    }
}
