mod binder_contract;
mod cursor_contract;
mod evaluator_contract;
