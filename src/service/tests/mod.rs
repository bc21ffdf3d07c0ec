use super::test_helpers::{create_memory_counter, create_test_counter, test_config, wait_for_terminal};
use super::*;
use crate::error::Error;
use crate::types::{JobState, Progress};
