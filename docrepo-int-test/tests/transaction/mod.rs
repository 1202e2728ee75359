mod transaction_scope_test;
