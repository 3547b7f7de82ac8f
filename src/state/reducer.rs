use super::types::{ActionKind, ApplicationState, IncomingAction, Todo};

/// Compute the state that results from applying `action` to `state`.
///
/// The reducer is total: duplicate adds, unauthorized edits and toggles, and actions without an
/// acting author leave the state as it was. The input state is never modified; the result is
/// always a fresh value.
pub fn reduce(state: &ApplicationState, action: &IncomingAction) -> ApplicationState {
	match action.kind {
		ActionKind::Add => add_todo(state, action),
		ActionKind::Edit => edit_todo(state, action),
		ActionKind::Toggle => toggle_todo(state, action),
	}
}

fn add_todo(state: &ApplicationState, action: &IncomingAction) -> ApplicationState {
	let Some(author) = action.acting_author() else {
		return state.clone();
	};

	// ids are unique; a repeated add is a no-op
	if state.find(&action.data.id).is_some() {
		return state.clone();
	}

	let mut todos = state.todos.clone();
	todos.push(Todo {
		id: action.data.id.clone(),
		text: action.data.text.clone().unwrap_or_default(),
		author: author.to_string(),
		completed: false,
	});

	ApplicationState { todos }
}

fn edit_todo(state: &ApplicationState, action: &IncomingAction) -> ApplicationState {
	let Some(text) = &action.data.text else {
		return state.clone();
	};

	update_owned(state, action, |todo| Todo {
		text: text.clone(),
		..todo.clone()
	})
}

fn toggle_todo(state: &ApplicationState, action: &IncomingAction) -> ApplicationState {
	update_owned(state, action, |todo| Todo {
		completed: !todo.completed,
		..todo.clone()
	})
}

/// Rebuild the todo list, replacing the entry that matches the action's id and acting author.
fn update_owned<F>(state: &ApplicationState, action: &IncomingAction, update: F) -> ApplicationState
where
	F: Fn(&Todo) -> Todo,
{
	let Some(author) = action.acting_author() else {
		return state.clone();
	};

	let todos = state
		.todos
		.iter()
		.map(|todo| {
			if todo.id == action.data.id && todo.author == author {
				update(todo)
			} else {
				todo.clone()
			}
		})
		.collect();

	ApplicationState { todos }
}
