mod connection_builder_test;
