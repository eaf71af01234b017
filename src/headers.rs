use std::collections::HashMap;

use anyhow::{bail, Result};

/// Request headers keyed by lowercased field name.
#[derive(Debug, Clone, Default)]
pub struct Headers(pub HashMap<String, String>);

impl Headers {
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    /// Adds a field, combining it with any earlier value of the same name.
    pub fn append(&mut self, k: &str, v: &str) {
        self.0
            .entry(k.to_lowercase())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(v);
            })
            .or_insert_with(|| v.to_string());
    }

    pub fn get(&self, k: &str) -> Option<&String> {
        self.0.get(k.to_lowercase().as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parses a header block up to and including its terminating blank line.
    ///
    /// Returns the headers and the number of bytes consumed from `data`. Lines
    /// beginning with a space or tab are folded into the previous field.
    pub fn parse_headers(data: &[u8]) -> Result<(Self, usize)> {
        let mut headers = Self::new();
        let mut pending: Option<(String, String)> = None;
        let mut pos = 0;

        loop {
            let Some(line_len) = data[pos..].iter().position(|&b| b == b'\n') else {
                bail!("header block not terminated within {} bytes", data.len());
            };
            let raw = &data[pos..pos + line_len];
            pos += line_len + 1;
            let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
            let line = String::from_utf8_lossy(raw);

            if line.is_empty() {
                if let Some((name, value)) = pending.take() {
                    headers.append(&name, &value);
                }
                return Ok((headers, pos));
            }

            if line.starts_with([' ', '\t']) {
                match pending.as_mut() {
                    Some((_, value)) => {
                        let folded = line.trim();
                        if !folded.is_empty() {
                            if !value.is_empty() {
                                value.push(' ');
                            }
                            value.push_str(folded);
                        }
                        continue;
                    }
                    None => bail!("continuation line with no preceding header: '{}'", line),
                }
            }

            if let Some((name, value)) = pending.take() {
                headers.append(&name, &value);
            }
            pending = Some(Self::parse_field_line(&line)?);
        }
    }

    fn parse_field_line(line: &str) -> Result<(String, String)> {
        let Some((field_name, field_value)) = line.split_once(':') else {
            bail!("No ':' found in raw_header: {}", line);
        };
        if field_name.trim_end() != field_name {
            bail!("Field name included invalid whitespace: '{}'", line);
        }
        if !Self::valid_field_name(field_name) {
            bail!("Invalid characters detected: '{}'", field_name);
        }
        Ok((field_name.to_string(), field_value.trim().to_string()))
    }

    fn valid_field_name(s: &str) -> bool {
        const SPECIAL_CHARS: [char; 15] = [
            '!', '#', '$', '%', '&', '\'', '*', '+', '-', '.', '^', '_', '`', '|', '~',
        ];
        !s.is_empty()
            && s.chars().all(|c| c.is_ascii_alphanumeric() || SPECIAL_CHARS.contains(&c))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn headers_basics() {
        let test_data = [
            b"Host: localhost:4221\r\n\r\n".to_vec(),
            b"Host : localhost:4221\r\n\r\n".to_vec(), // invalid space
            b"Host: localhost:4221\r\nContent-Type:   text/plain\r\n\r\n".to_vec(),
            "H\u{a9}st: localhost:4221\r\n\r\n".as_bytes().to_vec(), // invalid character
            b"Host: localhost:4221\r\nContent-Type:   text/plain\r\nContent-Type: application/json\r\n\r\n".to_vec(),
            b"Set-Person: lane-loves-go\r\nSet-Person: prime-loves-zig\r\nSet-Person: tj-loves-ocaml\r\n\r\n".to_vec(),
            b"Set-Person: lane-loves-go\r\nSet-Person: prime-loves-zig\r\nSet-Person: tj-loves-ocaml".to_vec(), // missing \r\n\r\n
            b"Host localhost:4221\r\n\r\n".to_vec(), // missing ':'
        ];
        let expected = [
            ("Host", "localhost:4221"),
            ("", ""), // err placeholder
            ("Content-Type", "text/plain"),
            ("", ""), // err placeholder
            ("Content-Type", "text/plain, application/json"),
            ("Set-Person", "lane-loves-go, prime-loves-zig, tj-loves-ocaml"),
            ("", ""), // err placeholder
            ("", ""), // err placeholder
        ];

        for (i, test_line) in test_data.iter().enumerate() {
            let result = Headers::parse_headers(test_line);
            if [1, 3, 6, 7].contains(&i) {
                assert!(result.is_err(), "case {} should fail", i + 1);
            } else {
                let (headers, consumed) = result.unwrap();
                assert_eq!(consumed, test_line.len());
                assert_eq!(headers.get(expected[i].0).map(|s| s.as_str()), Some(expected[i].1));
            }
        }
    }

    #[test]
    fn lookup_ignores_case() {
        let (headers, _) = Headers::parse_headers(b"user-agent: curl/8.5.0\r\n\r\n").unwrap();
        assert_eq!(headers.get("User-Agent").map(|s| s.as_str()), Some("curl/8.5.0"));
        assert_eq!(headers.get("USER-AGENT").map(|s| s.as_str()), Some("curl/8.5.0"));
    }

    #[test]
    fn folded_lines_join_previous_value() {
        let data = b"X-Long: first\r\n  second\r\n\tthird\r\nHost: a\r\n\r\n";
        let (headers, _) = Headers::parse_headers(data).unwrap();
        assert_eq!(headers.get("x-long").map(|s| s.as_str()), Some("first second third"));
        assert_eq!(headers.len(), 2);
    }

    #[test]
    fn continuation_without_header_fails() {
        assert!(Headers::parse_headers(b"   Host: a\r\n\r\n").is_err());
    }

    #[test]
    fn consumed_stops_at_blank_line() {
        let data = b"Content-Length: 5\r\n\r\nhello";
        let (headers, consumed) = Headers::parse_headers(data).unwrap();
        assert_eq!(&data[consumed..], b"hello");
        assert_eq!(headers.get("content-length").map(|s| s.as_str()), Some("5"));
    }

    #[test]
    fn bare_lf_accepted() {
        let (headers, consumed) = Headers::parse_headers(b"Host: a\n\n").unwrap();
        assert_eq!(consumed, 9);
        assert_eq!(headers.get("host").map(|s| s.as_str()), Some("a"));
    }

    #[test]
    fn empty_block() {
        let (headers, consumed) = Headers::parse_headers(b"\r\n").unwrap();
        assert!(headers.is_empty());
        assert_eq!(consumed, 2);
    }
}
