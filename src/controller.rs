use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use tracing::trace;

use crate::domain::{GridError, Message};
use crate::filter::{Condition, FilterValue};

#[derive(Debug, Clone)]
pub enum Command {
    Update(Message),
    // Let the clock run, e.g. for the search debounce
    Wait(Duration),
}

#[derive(Debug, Deserialize)]
struct EditArgs {
    key: String,
    value: Value,
    #[serde(default)]
    row: Value,
}

/// Maps lines of a grid script to messages.
///
/// ```text
/// search ann
/// filter age gte 30
/// filter status in [active,lead]
/// apply
/// sort name
/// page 2
/// ```
#[derive(Debug, Default)]
pub struct Controller {
    line_no: usize,
}

impl Controller {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blank lines and `#` comments yield `None`.
    pub fn handle_line(&mut self, line: &str) -> Result<Option<Command>, GridError> {
        self.line_no += 1;
        let line = line.trim_end_matches(['\r', '\n']);
        let trimmed = line.trim_start();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return Ok(None);
        }

        let (command, rest) = match trimmed.split_once(' ') {
            Some((command, rest)) => (command, rest),
            None => (trimmed, ""),
        };
        let args: Vec<&str> = rest.split_whitespace().collect();

        let message = match command {
            // Keep the raw text, trimming is the search's job
            "search" => Message::SearchInput(rest.to_string()),
            "filter" => Self::filter(rest)?,
            "apply" => Message::ApplyFilters,
            "clear" => Message::ClearFilters,
            "sort" => Message::ToggleSort(Self::key(command, &args)?),
            "page" => Message::GoToPage(Self::number(command, args.first())?),
            "next" => Message::NextPage,
            "prev" => Message::PreviousPage,
            "loaded" => Message::Loaded {
                total_items: Self::number(command, args.first())?,
            },
            "move" => Message::Reorder {
                from: Self::number(command, args.first())?,
                to: args
                    .get(1)
                    .map(|to| Self::number(command, Some(to)))
                    .transpose()?,
            },
            "show" | "hide" => Message::SetVisible {
                key: Self::key(command, &args)?,
                visible: command == "show",
            },
            "commit" => Message::CommitColumns,
            "reset" => Message::ResetColumns,
            "edit" => {
                let edit: EditArgs = serde_json::from_str(rest)
                    .map_err(|e| GridError::invalid_argument(command, e.to_string()))?;
                Message::EditCell {
                    row: edit.row,
                    key: edit.key,
                    value: edit.value,
                }
            }
            "wait" => {
                let ms: u64 = Self::number(command, args.first())?;
                return Ok(Some(Command::Wait(Duration::from_millis(ms))));
            }
            other => return Err(GridError::UnknownCommand(other.to_string())),
        };
        trace!("Line {}: {line:?} => {message:?}", self.line_no);
        Ok(Some(Command::Update(message)))
    }

    pub fn line_no(&self) -> usize {
        self.line_no
    }

    fn key(command: &str, args: &[&str]) -> Result<String, GridError> {
        args.first()
            .map(|k| k.to_string())
            .ok_or_else(|| GridError::invalid_argument(command, "missing column key"))
    }

    fn number<T: std::str::FromStr>(command: &str, arg: Option<&&str>) -> Result<T, GridError> {
        let arg = arg.ok_or_else(|| GridError::invalid_argument(command, "missing number"))?;
        arg.parse()
            .map_err(|_| GridError::invalid_argument(command, format!("'{arg}' is not a number")))
    }

    // filter <key> <condition> [value], where `[a,b]` is a list. The value is
    // the rest of the line with its inner spacing intact.
    fn filter(rest: &str) -> Result<Message, GridError> {
        let (key, rest) = split_token(rest);
        let (condition, value) = split_token(rest);
        if key.is_empty() || condition.is_empty() {
            return Err(GridError::invalid_argument(
                "filter",
                "expected: filter <key> <condition> [value]",
            ));
        }
        let condition: Condition = condition.parse()?;
        let value = value.trim();
        let value = if value.is_empty() {
            None
        } else if let Some(list) = value.strip_prefix('[').and_then(|v| v.strip_suffix(']')) {
            Some(FilterValue::List(
                list.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect(),
            ))
        } else {
            Some(FilterValue::Text(value.to_string()))
        };
        Ok(Message::SetFilter {
            key: key.to_string(),
            condition,
            value,
        })
    }
}

fn split_token(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    s.split_once(char::is_whitespace).unwrap_or((s, ""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message(line: &str) -> Message {
        match Controller::new().handle_line(line).unwrap() {
            Some(Command::Update(message)) => message,
            other => panic!("expected a message for {line:?}, got {other:?}"),
        }
    }

    #[test]
    fn skips_blank_and_comment_lines() {
        let mut controller = Controller::new();
        assert!(controller.handle_line("").unwrap().is_none());
        assert!(controller.handle_line("   # note").unwrap().is_none());
        assert_eq!(controller.line_no(), 2);
    }

    #[test]
    fn search_keeps_raw_text() {
        assert!(matches!(message("search  abc "), Message::SearchInput(s) if s == " abc "));
        assert!(matches!(message("search"), Message::SearchInput(s) if s.is_empty()));
    }

    #[test]
    fn filter_lines() {
        match message("filter age >= 30") {
            Message::SetFilter {
                key,
                condition,
                value,
            } => {
                assert_eq!(key, "age");
                assert_eq!(condition, Condition::Gte);
                assert_eq!(value, Some(FilterValue::Text("30".into())));
            }
            other => panic!("unexpected {other:?}"),
        }
        match message("filter status in [active, lead]") {
            Message::SetFilter { value, .. } => {
                assert_eq!(value, Some(vec!["active", "lead"].into()));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            message("filter name contains"),
            Message::SetFilter { value: None, .. }
        ));
    }

    #[test]
    fn filter_value_keeps_inner_spacing() {
        match message("filter  name   equals Ann  Lee ") {
            Message::SetFilter {
                key,
                condition,
                value,
            } => {
                assert_eq!(key, "name");
                assert_eq!(condition, Condition::Equals);
                assert_eq!(value, Some(FilterValue::Text("Ann  Lee".into())));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn column_and_page_lines() {
        assert!(matches!(message("move 3"), Message::Reorder { from: 3, to: None }));
        assert!(matches!(message("move 3 1"), Message::Reorder { from: 3, to: Some(1) }));
        assert!(matches!(
            message("hide age"),
            Message::SetVisible { visible: false, .. }
        ));
        assert!(matches!(message("page 4"), Message::GoToPage(4)));
        assert!(matches!(message("loaded 120"), Message::Loaded { total_items: 120 }));
    }

    #[test]
    fn edit_line_takes_json() {
        match message(r#"edit {"key": "name", "value": "Ann B", "row": {"id": 3}}"#) {
            Message::EditCell { row, key, value } => {
                assert_eq!(key, "name");
                assert_eq!(value, json!("Ann B"));
                assert_eq!(row, json!({ "id": 3 }));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn wait_yields_duration() {
        let command = Controller::new().handle_line("wait 350").unwrap();
        assert!(matches!(command, Some(Command::Wait(d)) if d == Duration::from_millis(350)));
    }

    #[test]
    fn bad_lines_are_errors() {
        let mut controller = Controller::new();
        assert!(matches!(
            controller.handle_line("explode"),
            Err(GridError::UnknownCommand(_))
        ));
        assert!(matches!(
            controller.handle_line("page two"),
            Err(GridError::InvalidArgument { .. })
        ));
        assert!(matches!(
            controller.handle_line("filter age between 1"),
            Err(GridError::InvalidArgument { .. })
        ));
        assert!(controller.handle_line("sort").is_err());
    }
}
