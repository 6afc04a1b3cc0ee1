use std::path::{Path, PathBuf};

use migrun_common::{Error, Result};
use tracing::{info, warn};

/// One independently executable step of a migration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub ordinal: usize,
    pub name: String,
    pub sql: String,
}

/// A step of the built-in plan.
pub struct PlannedStep {
    pub name: &'static str,
    pub sql: &'static str,
}

/// Hand-authored decomposition of
/// `20251114155316_add_is_default_to_trading_accounts.sql`.
/// The remote SQL gateway may only accept simple statements, so the file is
/// not sent as one script. Order matters: the trigger needs the function.
pub const BUILTIN_PLAN: &[PlannedStep] = &[
    PlannedStep {
        name: "add column",
        sql: "ALTER TABLE public.trading_accounts
    ADD COLUMN IF NOT EXISTS is_default BOOLEAN DEFAULT false;",
    },
    PlannedStep {
        name: "create index",
        sql: "CREATE INDEX IF NOT EXISTS idx_trading_accounts_is_default
    ON public.trading_accounts(user_id, is_default)
    WHERE is_default = true;",
    },
    PlannedStep {
        name: "add comment",
        sql: "COMMENT ON COLUMN public.trading_accounts.is_default IS 'Indicates if this is the default account for positions display. Only one account per user should be default.';",
    },
    PlannedStep {
        name: "create trigger function",
        sql: "CREATE OR REPLACE FUNCTION ensure_single_default_account()
    RETURNS TRIGGER AS $$
    BEGIN
      IF NEW.is_default = true THEN
        UPDATE public.trading_accounts
        SET is_default = false
        WHERE user_id = NEW.user_id
        AND id != NEW.id
        AND is_default = true;
      END IF;
      RETURN NEW;
    END;
    $$ LANGUAGE plpgsql;",
    },
    PlannedStep {
        name: "create trigger",
        sql: "DROP TRIGGER IF EXISTS enforce_single_default_account ON public.trading_accounts;
    CREATE TRIGGER enforce_single_default_account
      BEFORE INSERT OR UPDATE ON public.trading_accounts
      FOR EACH ROW
      EXECUTE FUNCTION ensure_single_default_account();",
    },
];

/// Where the statement list comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlanSource {
    /// The fixed plan above; the file is read but not parsed.
    #[default]
    Builtin,
    /// Split the file text itself into statements.
    SplitFile,
}

/// A loaded migration: the file it came from and its ordered statements.
#[derive(Debug, Clone)]
pub struct MigrationPlan {
    pub path: PathBuf,
    pub source_len: usize,
    pub statements: Vec<Statement>,
}

/// Read the migration file and produce the ordered statement list.
///
/// Fails with [`Error::MigrationFile`] when the file is missing or unreadable.
pub fn load_statements(path: &Path, source: PlanSource) -> Result<MigrationPlan> {
    let text = std::fs::read_to_string(path).map_err(|e| Error::MigrationFile {
        path: path.to_path_buf(),
        source: e,
    })?;
    info!(
        "read migration {} ({} characters)",
        path.display(),
        text.chars().count()
    );

    let statements = match source {
        PlanSource::Builtin => BUILTIN_PLAN
            .iter()
            .enumerate()
            .map(|(i, step)| Statement {
                ordinal: i + 1,
                name: step.name.to_string(),
                sql: step.sql.to_string(),
            })
            .collect(),
        PlanSource::SplitFile => split_sql(&text)
            .into_iter()
            .enumerate()
            .map(|(i, sql)| Statement {
                ordinal: i + 1,
                name: summarize(&sql),
                sql,
            })
            .collect::<Vec<_>>(),
    };

    if statements.is_empty() {
        warn!("migration {} produced no statements", path.display());
    }

    Ok(MigrationPlan {
        path: path.to_path_buf(),
        source_len: text.chars().count(),
        statements,
    })
}

/// Split SQL text on `;` terminators that are outside single-quoted strings,
/// double-quoted identifiers, `--` / `/* */` comments and dollar-quoted bodies.
/// Each returned statement keeps its trailing `;`. Fragments with nothing but
/// whitespace or comments are dropped.
pub fn split_sql(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut has_code = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        match c {
            '-' if next == Some('-') => {
                while i < chars.len() && chars[i] != '\n' {
                    current.push(chars[i]);
                    i += 1;
                }
                continue;
            }
            '/' if next == Some('*') => {
                let end = find_from(&chars, i + 2, &['*', '/']).map_or(chars.len(), |e| e + 2);
                current.extend(&chars[i..end]);
                i = end;
                continue;
            }
            '\'' | '"' => {
                let backslash_escapes = c == '\'' && is_escape_string_prefix(&chars, i);
                let end = closing_quote(&chars, i + 1, c, backslash_escapes);
                current.extend(&chars[i..end]);
                has_code = true;
                i = end;
                continue;
            }
            '$' if i == 0 || !is_ident_char(chars[i - 1]) => {
                if let Some(tag_end) = dollar_tag_end(&chars, i) {
                    let tag: Vec<char> = chars[i..=tag_end].to_vec();
                    let end = find_from(&chars, tag_end + 1, &tag)
                        .map_or(chars.len(), |e| e + tag.len());
                    current.extend(&chars[i..end]);
                    has_code = true;
                    i = end;
                    continue;
                }
            }
            ';' => {
                current.push(';');
                if has_code {
                    statements.push(current.trim().to_string());
                }
                current.clear();
                has_code = false;
                i += 1;
                continue;
            }
            _ => {}
        }

        if !c.is_whitespace() {
            has_code = true;
        }
        current.push(c);
        i += 1;
    }

    if has_code {
        let mut tail = current.trim().to_string();
        tail.push(';');
        statements.push(tail);
    }
    statements
}

/// Index one past the closing quote, honouring doubled quotes as escapes.
/// In `E'...'` strings a backslash also escapes the next character.
fn closing_quote(chars: &[char], mut i: usize, quote: char, backslash_escapes: bool) -> usize {
    while i < chars.len() {
        if backslash_escapes && chars[i] == '\\' {
            i += 2;
            continue;
        }
        if chars[i] == quote {
            if chars.get(i + 1) == Some(&quote) {
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }
    chars.len()
}

/// Whether the quote at `quote` opens an escape string: `E'...'` where the
/// `E` is not the tail of a longer identifier.
fn is_escape_string_prefix(chars: &[char], quote: usize) -> bool {
    match quote.checked_sub(1).map(|p| chars[p]) {
        Some('E' | 'e') => quote < 2 || !is_ident_char(chars[quote - 2]),
        _ => false,
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// If a dollar-quote tag (`$$` or `$name$`) starts at `start`, return the
/// index of its closing `$`.
fn dollar_tag_end(chars: &[char], start: usize) -> Option<usize> {
    let mut i = start + 1;
    while i < chars.len() {
        match chars[i] {
            '$' => return Some(i),
            c if c.is_alphanumeric() || c == '_' => i += 1,
            _ => return None,
        }
    }
    None
}

fn find_from(chars: &[char], from: usize, needle: &[char]) -> Option<usize> {
    if needle.is_empty() || from > chars.len() {
        return None;
    }
    chars[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}

/// Short label for a split statement: its first few keywords.
fn summarize(sql: &str) -> String {
    sql.lines()
        .map(str::trim)
        .find(|l| !l.is_empty() && !l.starts_with("--"))
        .unwrap_or_default()
        .split_whitespace()
        .take(3)
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

impl Statement {
    /// Whether the statement guards itself against re-application.
    pub fn is_idempotent(&self) -> bool {
        let upper = self.sql.to_uppercase();
        ["IF NOT EXISTS", "IF EXISTS", "OR REPLACE"]
            .iter()
            .any(|guard| upper.contains(guard))
    }

    /// Single-line preview: whitespace collapsed, first `max` characters
    /// followed by `...`.
    pub fn preview(&self, max: usize) -> String {
        let flat = self.sql.split_whitespace().collect::<Vec<_>>().join(" ");
        let head: String = flat.chars().take(max).collect();
        format!("{head}...")
    }
}
