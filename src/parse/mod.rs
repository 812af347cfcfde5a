mod lexer;
mod parser;
mod token;

pub use lexer::{Lexeme, Lexer, Mode};
pub use parser::*;
pub use token::{Keyword, Token};
