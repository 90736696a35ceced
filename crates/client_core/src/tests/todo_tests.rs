use super::*;

fn todos(state: &TodoState) -> Vec<(&str, &str, bool)> {
    state
        .todos
        .iter()
        .map(|t| (t.id.0.as_str(), t.text.as_str(), t.completed))
        .collect()
}

#[test]
fn create_appends_with_length_based_id() {
    let state = reduce(TodoState::default(), &create_todo("buy milk"));
    assert_eq!(todos(&state), vec![("0", "buy milk", false)]);

    let state = reduce(state, &create_todo("walk dog"));
    assert_eq!(
        todos(&state),
        vec![("0", "buy milk", false), ("1", "walk dog", false)]
    );
}

#[test]
fn create_on_sample_continues_numbering() {
    let state = reduce(TodoState::sample(), &create_todo("third"));
    assert_eq!(state.todos.len(), 3);
    assert_eq!(state.todos[2].id.0, "2");
}

#[test]
fn toggle_twice_restores_the_flag_and_keeps_the_count() {
    let initial = TodoState::sample();
    let once = reduce(initial.clone(), &toggle_todo(0));
    assert!(!once.todos[0].completed);
    assert_eq!(once.todos.len(), initial.todos.len());

    let twice = reduce(once, &toggle_todo(0));
    assert_eq!(twice, initial);
}

#[test]
fn toggle_out_of_range_is_a_no_op() {
    let initial = TodoState::sample();
    let state = reduce(initial.clone(), &toggle_todo(7));
    assert_eq!(state, initial);
}

#[test]
fn foreign_actions_leave_state_untouched() {
    let initial = TodoState::sample();
    let state = reduce(
        initial.clone(),
        &crate::ducks::todo_pub_sub::create_todo("elsewhere"),
    );
    assert_eq!(state, initial);
}
