mod repository_crud_test;
mod repository_naming_test;
mod repository_update_test;
