use thiserror::Error;

pub type Result<T> = std::result::Result<T, HuffmanError>;

#[derive(Error, Debug)]
pub enum HuffmanError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not a valid compressed file: {0}")]
    InvalidFormat(String),

    #[error("heap overflow: capacity of {capacity} entries exceeded")]
    HeapOverflow { capacity: usize },

    #[error("heap underflow: pop on an empty heap")]
    HeapUnderflow,

    /// The source yielded a byte on the encoding pass that the counting pass never saw.
    #[error("byte {0:#04x} has no code; source changed between passes")]
    MissingSymbol(u8),
}

impl HuffmanError {
    pub(crate) fn format(msg: impl Into<String>) -> Self {
        HuffmanError::InvalidFormat(msg.into())
    }
}
