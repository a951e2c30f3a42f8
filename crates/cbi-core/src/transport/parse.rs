//! Parse HTTP response header lines into a ResponseHead.

use crate::result::ResponseHead;

/// Status code and reason phrase from a line like `HTTP/1.1 503 Service Unavailable`.
pub(crate) fn parse_status_line(line: &str) -> Option<(u32, String)> {
    let mut parts = line.trim().splitn(3, ' ');
    let version = parts.next()?;
    if !version.starts_with("HTTP/") {
        return None;
    }
    let code = parts.next()?.parse::<u32>().ok()?;
    let reason = parts.next().unwrap_or("").trim().to_string();
    Some((code, reason))
}

/// Build the head of the last response in `lines` (status line first).
pub(crate) fn parse_head(lines: &[String]) -> Option<ResponseHead> {
    let (status, reason) = parse_status_line(lines.first()?)?;
    let mut head = ResponseHead {
        status,
        reason,
        ..ResponseHead::default()
    };
    for line in &lines[1..] {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            let name = name.trim();
            let value = value.trim();
            if name.eq_ignore_ascii_case("content-length") {
                if let Ok(n) = value.parse::<u64>() {
                    head.content_length = Some(n);
                }
            }
            if name.eq_ignore_ascii_case("content-type") {
                head.content_type = Some(value.to_string());
            }
        }
    }
    Some(head)
}
