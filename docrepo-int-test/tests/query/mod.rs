mod query_composition_test;
mod query_terminal_test;
