pub fn col_not_in_table(column_name: &str, table_name: &str) -> String {
    format!("Column `{column_name}` not found within table `{table_name}`.")
}

pub fn unknown_table_in_relation(relation_name: &str, table_name: &str) -> String {
    format!("Relation `{relation_name}` points to unknown table `{table_name}`.")
}

pub fn unknown_relation(relation_name: &str, table_name: &str) -> String {
    format!("Relation `{relation_name}` not found on table `{table_name}`.")
}

pub fn duplicate_table(table_name: &str) -> String {
    format!("Table `{table_name}` is declared more than once.")
}

pub fn duplicate_relation(relation_name: &str, table_name: &str) -> String {
    format!("Relation `{relation_name}` is declared more than once on table `{table_name}`.")
}

pub fn unparsable_column_name(reason: &str) -> String {
    format!("Column name could not be parsed. {reason}")
}

pub fn relation_without_link(relation_name: &str) -> String {
    format!("Relation `{relation_name}` has no join keys.")
}

pub fn aggregate_on_path_to_one() -> String {
    "Aggregate functions can only be applied to relations that join many records.".to_string()
}

pub fn field_required(field: &str) -> String {
    format!("The {field} field is required.")
}

pub fn selected_field_invalid(field: &str) -> String {
    format!("The selected {field} is invalid.")
}

pub fn unknown_table_id(table_id: usize) -> String {
    format!("No table with id {table_id} exists in the schema.")
}
