mod helpers;
mod test_checkers;
mod test_init;
mod test_verify;
