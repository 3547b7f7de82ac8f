//! Types for the todo application state and the actions that drive it

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A single todo entry as tracked from the chain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Todo {
	/// Caller-supplied identifier, unique within the state.
	pub id: String,
	pub text: String,
	/// Actor that created the todo. Only this actor may edit or toggle it.
	pub author: String,
	pub completed: bool,
}

/// The whole application state, in insertion order (first added first).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApplicationState {
	pub todos: Vec<Todo>,
}

impl ApplicationState {
	/// Look up a todo by id.
	pub fn find(&self, id: &str) -> Option<&Todo> {
		self.todos.iter().find(|todo| todo.id == id)
	}
}

/// The closed set of contract actions the reducer understands.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
	Add,
	Edit,
	Toggle,
}

impl ActionKind {
	/// The on-chain action name for this kind.
	pub fn action_name(&self) -> &'static str {
		match self {
			ActionKind::Add => "addtodo",
			ActionKind::Edit => "edittodo",
			ActionKind::Toggle => "toggletodo",
		}
	}
}

impl fmt::Display for ActionKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.action_name())
	}
}

/// Error returned when an action name is not one of the contract's actions
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown action name: {0}")]
pub struct UnknownActionKind(pub String);

impl FromStr for ActionKind {
	type Err = UnknownActionKind;

	fn from_str(name: &str) -> Result<Self, Self::Err> {
		match name {
			"addtodo" => Ok(ActionKind::Add),
			"edittodo" => Ok(ActionKind::Edit),
			"toggletodo" => Ok(ActionKind::Toggle),
			other => Err(UnknownActionKind(other.to_string())),
		}
	}
}

/// One entry of an action's authorization list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PermissionLevel {
	pub actor: String,
	#[serde(default)]
	pub permission: String,
}

/// Payload of a todo action.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActionData {
	pub id: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub text: Option<String>,
}

/// An accepted chain action in the shape the reducer consumes.
///
/// Built by the action filter for a single chain action and dropped once reduced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IncomingAction {
	pub kind: ActionKind,
	pub account: String,
	/// Authorization list in chain order. The first entry is the acting author.
	pub authorization: Vec<PermissionLevel>,
	pub data: ActionData,
}

impl IncomingAction {
	/// The actor the action is attributed to.
	pub fn acting_author(&self) -> Option<&str> {
		self.authorization.first().map(|level| level.actor.as_str())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_action_kind_names() {
		for kind in [ActionKind::Add, ActionKind::Edit, ActionKind::Toggle] {
			assert_eq!(kind.action_name().parse::<ActionKind>(), Ok(kind));
		}
		assert_eq!(
			"transfer".parse::<ActionKind>(),
			Err(UnknownActionKind("transfer".to_string()))
		);
	}

	#[test]
	fn test_state_serializes_as_todo_list() {
		let state = ApplicationState {
			todos: vec![Todo {
				id: "t1".to_string(),
				text: "buy milk".to_string(),
				author: "alice".to_string(),
				completed: false,
			}],
		};

		let value = serde_json::to_value(&state).expect("Failed to serialize state");
		assert_eq!(
			value,
			serde_json::json!({
				"todos": [
					{ "id": "t1", "text": "buy milk", "author": "alice", "completed": false }
				]
			})
		);
	}
}
