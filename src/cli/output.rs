//! Colored terminal output for release operations
//!
//! Provides consistent, colored CLI output with proper formatting. Every write is
//! passed through the active redaction filter so secrets never reach the terminal.

use std::borrow::Cow;
use std::io::Write;
use std::sync::{Arc, RwLock};
use termcolor::{Buffer, BufferWriter, Color, ColorChoice, ColorSpec, WriteColor};

const REDACTED: &str = "[secure]";

/// Output manager for consistent colored terminal output
#[derive(Debug, Clone)]
pub struct OutputManager {
    color: ColorChoice,
    verbose: bool,
    quiet: bool,
    secrets: Arc<RwLock<Vec<String>>>,
}

impl OutputManager {
    /// Create a new output manager
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self {
            color: ColorChoice::Auto,
            verbose,
            quiet,
            secrets: Arc::new(RwLock::new(Vec::new())),
        }
    }

    fn stdout(&self) -> BufferWriter {
        BufferWriter::stdout(self.color)
    }

    /// Hide `secrets` in all output until the returned scope is dropped
    pub fn redact(&self, secrets: Vec<String>) -> RedactionScope {
        let added: Vec<String> = secrets.into_iter().filter(|s| !s.is_empty()).collect();
        if let Ok(mut active) = self.secrets.write() {
            active.extend(added.iter().cloned());
            // Longest first so a secret containing another is replaced whole
            active.sort_by_key(|s| std::cmp::Reverse(s.len()));
        }
        RedactionScope {
            secrets: Arc::clone(&self.secrets),
            added,
        }
    }

    /// Apply the active redaction filter to `message`
    pub fn redacted<'m>(&self, message: &'m str) -> Cow<'m, str> {
        let Ok(active) = self.secrets.read() else {
            return Cow::Borrowed(message);
        };
        let mut out = Cow::Borrowed(message);
        for secret in active.iter() {
            if out.contains(secret.as_str()) {
                out = Cow::Owned(out.replace(secret.as_str(), REDACTED));
            }
        }
        out
    }

    fn print_tagged(&self, tag: &str, tag_spec: &ColorSpec, message: &str) -> std::io::Result<()> {
        if self.quiet {
            return Ok(());
        }

        let bufwtr = self.stdout();
        let mut buffer = bufwtr.buffer();
        let _ = buffer.set_color(tag_spec);
        let _ = write!(&mut buffer, "{tag}");
        let _ = buffer.reset();
        let _ = writeln!(&mut buffer, " {}", self.redacted(message));
        bufwtr.print(&buffer)
    }

    /// Print an info message (normal output)
    pub fn info(&self, message: &str) -> std::io::Result<()> {
        self.print_tagged("ℹ", ColorSpec::new().set_fg(Some(Color::Cyan)), message)
    }

    /// Print a success message
    pub fn success(&self, message: &str) -> std::io::Result<()> {
        self.print_tagged(
            "✓",
            ColorSpec::new().set_fg(Some(Color::Green)).set_bold(true),
            message,
        )
    }

    /// Print a warning message
    pub fn warn(&self, message: &str) -> std::io::Result<()> {
        self.print_tagged(
            "⚠",
            ColorSpec::new().set_fg(Some(Color::Yellow)).set_bold(true),
            message,
        )
    }

    /// Print an error message (always shown)
    pub fn error(&self, message: &str) {
        let bufwtr = BufferWriter::stderr(self.color);
        let mut buffer = bufwtr.buffer();
        let message = self.redacted(message);

        if buffer.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true)).is_err()
            || write!(&mut buffer, "✗").is_err()
            || buffer.reset().is_err()
            || buffer.set_color(ColorSpec::new().set_fg(Some(Color::Red))).is_err()
            || writeln!(&mut buffer, " {}", message).is_err()
            || buffer.reset().is_err()
            || bufwtr.print(&buffer).is_err()
        {
            // Stderr failed - fallback to stdout as last resort
            println!("[STDERR ERROR] ✗ {}", message);
        }
    }

    /// Print a verbose/debug message (only in verbose mode)
    pub fn verbose(&self, message: &str) -> std::io::Result<()> {
        if !self.verbose {
            return Ok(());
        }
        self.print_tagged("→", ColorSpec::new().set_fg(Some(Color::Blue)), message)
    }

    /// Print indented text (for sub-items)
    pub fn indent(&self, message: &str) -> std::io::Result<()> {
        if self.quiet {
            return Ok(());
        }

        let bufwtr = self.stdout();
        let mut buffer = bufwtr.buffer();
        let _ = writeln!(&mut buffer, "    {}", self.redacted(message));
        bufwtr.print(&buffer)
    }

    /// Print a plain message (respects quiet mode)
    pub fn println(&self, message: &str) -> std::io::Result<()> {
        if self.quiet {
            return Ok(());
        }

        let bufwtr = self.stdout();
        let mut buffer = bufwtr.buffer();
        let _ = writeln!(&mut buffer, "{}", self.redacted(message));
        bufwtr.print(&buffer)
    }

    /// Render markdown for the terminal.
    ///
    /// Headings are bold cyan, list bullets are normalized, inline code and links
    /// keep their text. Rendered markdown is printed even in quiet mode since it is
    /// the primary output of dry runs.
    pub fn markdown(&self, text: &str) -> std::io::Result<()> {
        let bufwtr = self.stdout();
        let mut buffer = bufwtr.buffer();
        render_markdown(&mut buffer, &self.redacted(text));
        bufwtr.print(&buffer)
    }
}

/// Active redaction of a set of secrets; dropping it removes them again
#[derive(Debug)]
pub struct RedactionScope {
    secrets: Arc<RwLock<Vec<String>>>,
    added: Vec<String>,
}

impl Drop for RedactionScope {
    fn drop(&mut self) {
        if let Ok(mut active) = self.secrets.write() {
            for secret in &self.added {
                if let Some(pos) = active.iter().position(|s| s == secret) {
                    active.remove(pos);
                }
            }
        }
    }
}

/// Values of environment variables that look like credentials
pub fn secrets_from_env<I>(vars: I) -> Vec<String>
where
    I: IntoIterator<Item = (String, String)>,
{
    const MARKERS: [&str; 5] = ["token", "password", "credential", "secret", "private"];

    vars.into_iter()
        .filter(|(name, value)| {
            let name = name.to_ascii_lowercase();
            value.trim().len() >= 5 && MARKERS.iter().any(|marker| name.contains(marker))
        })
        .map(|(_, value)| value)
        .collect()
}

fn render_markdown(buffer: &mut Buffer, text: &str) {
    let mut in_code_block = false;

    for line in text.lines() {
        let trimmed = line.trim_start();

        if trimmed.starts_with("```") {
            in_code_block = !in_code_block;
            continue;
        }
        if in_code_block {
            let _ = buffer.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)));
            let _ = writeln!(buffer, "    {line}");
            let _ = buffer.reset();
            continue;
        }

        if let Some(heading) = heading_text(trimmed) {
            let _ = buffer.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)).set_bold(true));
            let _ = writeln!(buffer, "{}", strip_inline(heading));
            let _ = buffer.reset();
        } else if let Some(item) = trimmed
            .strip_prefix("* ")
            .or_else(|| trimmed.strip_prefix("- "))
        {
            let indent = &line[..line.len() - trimmed.len()];
            let _ = writeln!(buffer, "{indent}  • {}", strip_inline(item));
        } else {
            let _ = writeln!(buffer, "{}", strip_inline(line));
        }
    }
}

fn heading_text(line: &str) -> Option<&str> {
    let level = line.chars().take_while(|c| *c == '#').count();
    if (1..=6).contains(&level) && line[level..].starts_with(' ') {
        Some(line[level..].trim())
    } else {
        None
    }
}

/// Strip emphasis markers and turn `[text](url)` into `text (url)`
fn strip_inline(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find('[') {
        let Some(mid) = rest[start..].find("](") else {
            break;
        };
        let Some(end) = rest[start + mid..].find(')') else {
            break;
        };
        let label = &rest[start + 1..start + mid];
        let url = &rest[start + mid + 2..start + mid + end];
        out.push_str(&rest[..start]);
        out.push_str(label);
        out.push_str(" (");
        out.push_str(url);
        out.push(')');
        rest = &rest[start + mid + end + 1..];
    }
    out.push_str(rest);

    out.replace("**", "").replace('`', "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redaction_scope_is_released_on_drop() {
        let output = OutputManager::new(false, true);
        {
            let _scope = output.redact(vec!["hunter22".to_string()]);
            assert_eq!(output.redacted("token=hunter22"), "token=[secure]");
        }
        assert_eq!(output.redacted("token=hunter22"), "token=hunter22");
    }

    #[test]
    fn test_longer_secret_wins() {
        let output = OutputManager::new(false, true);
        let _scope = output.redact(vec!["abcde".to_string(), "abcdefgh".to_string()]);
        assert_eq!(output.redacted("x abcdefgh y"), "x [secure] y");
    }

    #[test]
    fn test_secrets_from_env_filters_by_name_and_length() {
        let vars = vec![
            ("GH_TOKEN".to_string(), "ghp_123456".to_string()),
            ("NPM_PASSWORD".to_string(), "abc".to_string()),
            ("HOME".to_string(), "/home/ci".to_string()),
            ("GPG_PRIVATE_KEY".to_string(), "-----BEGIN".to_string()),
        ];
        assert_eq!(
            secrets_from_env(vars),
            vec!["ghp_123456".to_string(), "-----BEGIN".to_string()]
        );
    }

    #[test]
    fn test_strip_inline_links_and_emphasis() {
        assert_eq!(
            strip_inline("**core:** fix [#12](https://example.com/12) in `run`"),
            "core: fix #12 (https://example.com/12) in run"
        );
    }

    #[test]
    fn test_heading_text() {
        assert_eq!(heading_text("## 1.3.0 (2024-01-01)"), Some("1.3.0 (2024-01-01)"));
        assert_eq!(heading_text("#hashtag"), None);
        assert_eq!(heading_text("plain"), None);
    }
}
