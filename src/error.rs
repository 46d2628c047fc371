use thiserror::Error;

#[derive(Error, Debug)]
pub enum CovtreeError {
    #[error("input contains no report document")]
    MissingDocument,

    #[error("XML parse error at position {position}: {source}")]
    Xml {
        source: quick_xml::Error,
        position: usize,
    },

    #[error("<{element}> is missing required attribute `{attribute}`")]
    MissingAttribute { element: String, attribute: String },

    #[error("attribute `{attribute}` of <{element}> is not a valid integer: `{value}`")]
    InvalidInteger {
        element: String,
        attribute: String,
        value: String,
    },

    #[error("more than one conditional record for line {line}")]
    DuplicateConditional { line: u32 },
}

pub type Result<T> = std::result::Result<T, CovtreeError>;
