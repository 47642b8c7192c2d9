//! Compute Budget program instructions.
//!
//! Data is the variant index of the program's instruction union followed by
//! the little-endian argument. Index 0 is a retired variant and is never
//! produced. The instructions reference no accounts.

use ingl_sol::programs::COMPUTE_BUDGET_PROGRAM_ID;
use ingl_sol::Instruction;

const REQUEST_HEAP_FRAME: u8 = 1;
const SET_COMPUTE_UNIT_LIMIT: u8 = 2;
const SET_COMPUTE_UNIT_PRICE: u8 = 3;

fn budget_instruction(discriminant: u8, argument: &[u8]) -> Instruction {
    let mut data = Vec::with_capacity(1 + argument.len());
    data.push(discriminant);
    data.extend_from_slice(argument);
    Instruction {
        program_id: COMPUTE_BUDGET_PROGRAM_ID,
        accounts: Vec::new(),
        data,
    }
}

/// Request a larger heap for every program in the transaction.
pub fn request_heap_frame(total_bytes: u32) -> Instruction {
    budget_instruction(REQUEST_HEAP_FRAME, &total_bytes.to_le_bytes())
}

pub fn set_compute_unit_limit(units: u32) -> Instruction {
    budget_instruction(SET_COMPUTE_UNIT_LIMIT, &units.to_le_bytes())
}

/// Priority fee, in micro-lamports per compute unit.
pub fn set_compute_unit_price(micro_lamports: u64) -> Instruction {
    budget_instruction(SET_COMPUTE_UNIT_PRICE, &micro_lamports.to_le_bytes())
}
