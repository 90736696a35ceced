//! Operation documents shared by the server and the client.

pub const NEW_TODOS_SUBSCRIPTION: &str = r#"subscription todos {
  newTodos {
    id
    text
    completed
  }
}"#;

pub const ADD_TODO_MUTATION: &str = r#"mutation addTodo($text: String!) {
  addTodo(text: $text) {
    id
    text
    completed
  }
}"#;

pub const TOGGLE_TODO_MUTATION: &str = r#"mutation toggleTodo($id: ID!) {
  toggleTodo(id: $id) {
    id
    text
    completed
  }
}"#;

pub const TODO_LIST_QUERY: &str = r#"query todoList {
  todoList {
    todos {
      id
      text
      completed
    }
  }
}"#;

pub const COMMAND_EXECUTE_SUBSCRIPTION: &str = r#"subscription commandExecute($command: String!) {
  commandExecute(command: $command) {
    stdout
    finished
    timestamp
  }
}"#;

pub const NEW_TODOS_FIELD: &str = "newTodos";
pub const ADD_TODO_FIELD: &str = "addTodo";
pub const TOGGLE_TODO_FIELD: &str = "toggleTodo";
pub const TODO_LIST_FIELD: &str = "todoList";
pub const COMMAND_EXECUTE_FIELD: &str = "commandExecute";
