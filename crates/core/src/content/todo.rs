use serde::{Deserialize, Serialize};

use super::{unsupported, ContentEdit, ContentEditor, ContentView, ViewContext};
use crate::error::CoreError;
use crate::widget::{timestamp_id, WidgetData};

const TITLE: &str = "TODO List";
const TODOS_KEY: &str = "todos";
const TODO_ID_PREFIX: &str = "todo-";
const EMPTY_PLACEHOLDER: &str = "No tasks yet. Add one above!";

/// One entry of a todo widget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoItem {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub order: u32,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TodoEditor;

fn read_todos(data: &WidgetData) -> Result<Vec<TodoItem>, CoreError> {
    match data.get(TODOS_KEY) {
        None | Some(serde_json::Value::Null) => Ok(Vec::new()),
        Some(value) => serde_json::from_value(value.clone())
            .map_err(|e| CoreError::Validation(format!("Malformed todo list: {e}"))),
    }
}

fn write_todos(data: &WidgetData, todos: &[TodoItem]) -> Result<WidgetData, CoreError> {
    let value = serde_json::to_value(todos).map_err(|e| CoreError::Internal(e.to_string()))?;
    let mut next = data.clone();
    next.insert(TODOS_KEY.to_string(), value);
    Ok(next)
}

fn find_mut<'a>(todos: &'a mut [TodoItem], id: &str) -> Result<&'a mut TodoItem, CoreError> {
    todos
        .iter_mut()
        .find(|t| t.id == id)
        .ok_or_else(|| CoreError::NotFound {
            entity: "todo",
            id: id.to_string(),
        })
}

impl ContentEditor for TodoEditor {
    fn title(&self) -> &'static str {
        TITLE
    }

    fn view(&self, data: &WidgetData, _ctx: &ViewContext) -> ContentView {
        let mut items = read_todos(data).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Ignoring unreadable todo payload");
            Vec::new()
        });
        items.sort_by_key(|t| t.order);

        let completed = items.iter().filter(|t| t.completed).count();
        let total = items.len();
        ContentView::Todo {
            items,
            completed,
            total,
            placeholder: (total == 0).then_some(EMPTY_PLACEHOLDER),
        }
    }

    fn apply(&self, data: &WidgetData, edit: ContentEdit) -> Result<WidgetData, CoreError> {
        let mut todos = read_todos(data)?;

        match edit {
            ContentEdit::AddTodo(text) => {
                let text = text.trim();
                if text.is_empty() {
                    return Err(CoreError::Validation("Task text must not be empty".into()));
                }
                let order = todos.len() as u32;
                todos.push(TodoItem {
                    id: timestamp_id(TODO_ID_PREFIX),
                    text: text.to_string(),
                    completed: false,
                    order,
                });
            }
            ContentEdit::ToggleTodo(id) => {
                let item = find_mut(&mut todos, &id)?;
                item.completed = !item.completed;
            }
            ContentEdit::RemoveTodo(id) => {
                find_mut(&mut todos, &id)?;
                todos.retain(|t| t.id != id);
            }
            other => return Err(unsupported(TITLE, &other)),
        }

        write_todos(data, &todos)
    }
}
