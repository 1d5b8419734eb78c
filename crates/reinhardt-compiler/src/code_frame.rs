//! Source excerpts for diagnostics.

/// Lines shown around the offending line.
const RANGE: usize = 2;

/// Renders the lines around `start..end` with the range underlined:
///
/// ```text
/// 1  |  <div>
/// 2  |    <span>
///    |    ^^^^^^
/// 3  |  </div>
/// ```
///
/// Offsets are byte offsets into `source`. Lines end with `\n` or `\r\n`.
pub fn generate_code_frame(source: &str, start: usize, end: usize) -> String {
	let lines: Vec<&str> = source.split('\n').map(|line| line.strip_suffix('\r').unwrap_or(line)).collect();
	let mut out = Vec::new();
	// End offset of the line being examined, counting one byte per line break
	let mut count = 0;
	for (i, line) in lines.iter().enumerate() {
		count += line.len() + 1;
		if count < start {
			continue;
		}
		let mut j = i.saturating_sub(RANGE);
		while j <= i + RANGE || end > count {
			let Some(current) = lines.get(j) else {
				break;
			};
			out.push(format!("{:<3}|  {current}", j + 1));
			let line_len = current.len();
			if j == i {
				let pad = (start + 1).saturating_sub(count - line_len);
				let len = if end > count {
					line_len.saturating_sub(pad)
				} else {
					end.saturating_sub(start)
				};
				out.push(format!("   |  {}{}", " ".repeat(pad), "^".repeat(len)));
			} else if j > i {
				if end > count {
					let len = (end - count).min(line_len);
					out.push(format!("   |  {}", "^".repeat(len)));
				}
				count += line_len + 1;
			}
			j += 1;
		}
		break;
	}
	out.join("\n")
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_single_line() {
		let frame = generate_code_frame("<div>{{ a }</div>", 5, 11);
		assert_eq!(frame, "1  |  <div>{{ a }</div>\n   |       ^^^^^^");
	}

	#[test]
	fn test_context_lines() {
		let source = "<div>\n  <p>\n  <span>\n  </p>\n</div>\n<!-- end -->";
		let start = source.find("<span>").unwrap();
		let frame = generate_code_frame(source, start, start + 6);
		let lines: Vec<&str> = frame.lines().collect();
		assert_eq!(lines[0], "1  |  <div>");
		assert_eq!(lines[2], "3  |    <span>");
		assert_eq!(lines[3], "   |    ^^^^^^");
		assert_eq!(lines.last(), Some(&"5  |  </div>"));
	}

	#[test]
	fn test_range_spanning_lines() {
		let source = "<div\n  id=\"a\"\n>x</div>";
		let frame = generate_code_frame(source, 0, 13);
		assert!(frame.contains("1  |  <div\n   |  ^^^^"));
		assert!(frame.contains("2  |    id=\"a\"\n   |  ^^^^^^^^"));
	}
}
