mod codes;

pub use codes::{
    display_code_candidate,
    generate_unique_code,
    registration_number_candidate,
    CodeGenerationError,
    CodeSpace,
    DISPLAY_CODE_ALPHABET,
    MAX_CODE_ATTEMPTS,
};
