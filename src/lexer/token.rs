//! The tokens that the string can be parsed into.
//!
//! See [`Token`] for more information.

use std::fmt::{Debug, Display};
use std::collections::BTreeMap;
use once_cell::sync::Lazy;

use crate::err::CursorRange;

#[derive(PartialEq, Eq, Debug, Clone)]
/// A specific unit that carries some graphemic value in F-IA.
pub enum Token {
    /// An identifier, such as function names or variable names. (e.g. `abcd`, `a_b`, `été`)
    Ident(String),

    /// A numeric value (e.g. `123`, `123.1`, `1.11`)
    Numeric(String),

    /// A string literal (e.g. `"bonjour"`, `'salut'`)
    Str(String),

    /// Keywords (e.g. `soit`, `si`, `fonction`).
    ///
    /// These cannot be identifiers in any circumstance.
    Keyword(Keyword),

    /// Operators (e.g. `+`, `-`, `==`)
    Operator(Operator),

    /// Delimiters (e.g. `(`, `]`, `}`)
    Delimiter(Delimiter),

    /// End of line (`;`)
    LineSep,

    /// End of stream.
    ///
    /// This is always the last token produced by the lexer.
    Eof
}

/// A token with position information.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct FullToken {
    pub(crate) tt: Token,
    pub(crate) loc: CursorRange
}

impl FullToken {
    /// Create a FullToken using a token and its given position.
    pub fn new(tt: Token, loc: CursorRange) -> Self {
        Self { tt, loc }
    }
}

impl PartialEq<Token> for FullToken {
    fn eq(&self, other: &Token) -> bool {
        &self.tt == other
    }
}
impl PartialEq<FullToken> for Token {
    fn eq(&self, other: &FullToken) -> bool {
        self == &other.tt
    }
}

macro_rules! define_keywords {
    ($($id:ident: $ex:literal),*) => {
        /// Enum that provides all the given F-IA keywords
        #[derive(PartialEq, Eq, Debug, Clone, Copy, Hash)]
        pub enum Keyword {
            $(
                #[allow(missing_docs)] $id
            ),*
        }

        impl Keyword {
            /// If the string is a keyword, return the `Token` it represents
            /// or `None` if it does not represent a token.
            pub fn get_kw(s: &str) -> Option<Token> {
                match s {
                    $(
                        $ex => Some(Token::Keyword(Self::$id))
                    ),+ ,
                    _ => None
                }
            }
        }

        impl Display for Keyword {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(match self {
                    $(Self::$id => $ex),*
                })
            }
        }
    };
}

macro_rules! define_operators {
    ($($id:ident: $ex:literal),*) => {
        /// The defined F-IA operators.
        #[derive(PartialEq, Eq, Debug, Clone, Copy, Hash)]
        pub enum Operator {
            $(
                #[allow(missing_docs)] $id
            ),*
        }

        impl Display for Operator {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(match self {
                    $(Self::$id => $ex),*
                })
            }
        }

        pub(super) static OP_MAP: Lazy<BTreeMap<&'static str, Token>> = Lazy::new(|| {
            let mut m = BTreeMap::new();

            $(m.insert($ex, Token::Operator(Operator::$id));)*

            m
        });
    };
}

macro_rules! define_delimiters {
    ($($id:ident: $ex:literal),*) => {
        /// The defined F-IA delimiters (`(`, `]`, etc.).
        #[derive(PartialEq, Eq, Debug, Clone, Copy, Hash)]
        pub enum Delimiter {
            $(
                #[allow(missing_docs)] $id
            ),*
        }

        impl Display for Delimiter {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(match self {
                    $(Self::$id => $ex),*
                })
            }
        }

        pub(super) static DE_MAP: Lazy<BTreeMap<&'static str, Token>> = Lazy::new(|| {
            let mut m = BTreeMap::new();

            $(m.insert($ex, Token::Delimiter(Delimiter::$id));)*

            m
        });
    };
}

define_keywords! {
    Soit:      "soit",      // variable declarations
    Si:        "si",
    Sinon:     "sinon",
    Pour:      "pour",
    Dans:      "dans",      // pour x dans y
    TantQue:   "tant_que",
    Fonction:  "fonction",
    Retourner: "retourner",
    Vrai:      "vrai",
    Faux:      "faux",
    Nul:       "nul",
    Et:        "et",
    Ou:        "ou",
    Non:       "non",
    Essayer:   "essayer",   // reserved
    Attraper:  "attraper",  // reserved
    Importer:  "importer",
    Depuis:    "depuis",
    Comme:     "comme",     // importer "m" comme alias
    De:        "de"         // reserved
}

define_operators! {
    Plus:    "+",
    Minus:   "-",
    Star:    "*",
    Slash:   "/",
    Percent: "%",

    PlusEq:    "+=",
    MinusEq:   "-=",
    StarEq:    "*=",
    SlashEq:   "/=",
    PercentEq: "%=",

    Lt:     "<",
    Le:     "<=",
    Gt:     ">",
    Ge:     ">=",
    Equal:  "=",
    DEqual: "==",
    Ne:     "!=",

    Dot:   ".",
    Comma: ",",
    Colon: ":"
}

define_delimiters! {
    LParen:  "(",
    RParen:  ")",
    LSquare: "[",
    RSquare: "]",
    LCurly:  "{",
    RCurly:  "}"
}

/// Utility macro that can be used as a shorthand for [`Keyword`], [`Operator`], or [`Delimiter`] tokens.
#[macro_export]
macro_rules! token {
    (soit)      => { $crate::lexer::token::Token::Keyword($crate::lexer::token::Keyword::Soit)      };
    (si)        => { $crate::lexer::token::Token::Keyword($crate::lexer::token::Keyword::Si)        };
    (sinon)     => { $crate::lexer::token::Token::Keyword($crate::lexer::token::Keyword::Sinon)     };
    (pour)      => { $crate::lexer::token::Token::Keyword($crate::lexer::token::Keyword::Pour)      };
    (dans)      => { $crate::lexer::token::Token::Keyword($crate::lexer::token::Keyword::Dans)      };
    (tant_que)  => { $crate::lexer::token::Token::Keyword($crate::lexer::token::Keyword::TantQue)   };
    (fonction)  => { $crate::lexer::token::Token::Keyword($crate::lexer::token::Keyword::Fonction)  };
    (retourner) => { $crate::lexer::token::Token::Keyword($crate::lexer::token::Keyword::Retourner) };
    (vrai)      => { $crate::lexer::token::Token::Keyword($crate::lexer::token::Keyword::Vrai)      };
    (faux)      => { $crate::lexer::token::Token::Keyword($crate::lexer::token::Keyword::Faux)      };
    (nul)       => { $crate::lexer::token::Token::Keyword($crate::lexer::token::Keyword::Nul)       };
    (et)        => { $crate::lexer::token::Token::Keyword($crate::lexer::token::Keyword::Et)        };
    (ou)        => { $crate::lexer::token::Token::Keyword($crate::lexer::token::Keyword::Ou)        };
    (non)       => { $crate::lexer::token::Token::Keyword($crate::lexer::token::Keyword::Non)       };
    (essayer)   => { $crate::lexer::token::Token::Keyword($crate::lexer::token::Keyword::Essayer)   };
    (attraper)  => { $crate::lexer::token::Token::Keyword($crate::lexer::token::Keyword::Attraper)  };
    (importer)  => { $crate::lexer::token::Token::Keyword($crate::lexer::token::Keyword::Importer)  };
    (depuis)    => { $crate::lexer::token::Token::Keyword($crate::lexer::token::Keyword::Depuis)    };
    (comme)     => { $crate::lexer::token::Token::Keyword($crate::lexer::token::Keyword::Comme)     };
    (de)        => { $crate::lexer::token::Token::Keyword($crate::lexer::token::Keyword::De)        };

    (+)  => { $crate::lexer::token::Token::Operator($crate::lexer::token::Operator::Plus)      };
    (-)  => { $crate::lexer::token::Token::Operator($crate::lexer::token::Operator::Minus)     };
    (*)  => { $crate::lexer::token::Token::Operator($crate::lexer::token::Operator::Star)      };
    (/)  => { $crate::lexer::token::Token::Operator($crate::lexer::token::Operator::Slash)     };
    (%)  => { $crate::lexer::token::Token::Operator($crate::lexer::token::Operator::Percent)   };
    (+=) => { $crate::lexer::token::Token::Operator($crate::lexer::token::Operator::PlusEq)    };
    (-=) => { $crate::lexer::token::Token::Operator($crate::lexer::token::Operator::MinusEq)   };
    (*=) => { $crate::lexer::token::Token::Operator($crate::lexer::token::Operator::StarEq)    };
    (/=) => { $crate::lexer::token::Token::Operator($crate::lexer::token::Operator::SlashEq)   };
    (%=) => { $crate::lexer::token::Token::Operator($crate::lexer::token::Operator::PercentEq) };
    (<)  => { $crate::lexer::token::Token::Operator($crate::lexer::token::Operator::Lt)        };
    (<=) => { $crate::lexer::token::Token::Operator($crate::lexer::token::Operator::Le)        };
    (>)  => { $crate::lexer::token::Token::Operator($crate::lexer::token::Operator::Gt)        };
    (>=) => { $crate::lexer::token::Token::Operator($crate::lexer::token::Operator::Ge)        };
    (=)  => { $crate::lexer::token::Token::Operator($crate::lexer::token::Operator::Equal)     };
    (==) => { $crate::lexer::token::Token::Operator($crate::lexer::token::Operator::DEqual)    };
    (!=) => { $crate::lexer::token::Token::Operator($crate::lexer::token::Operator::Ne)        };
    (.)  => { $crate::lexer::token::Token::Operator($crate::lexer::token::Operator::Dot)       };
    (,)  => { $crate::lexer::token::Token::Operator($crate::lexer::token::Operator::Comma)     };
    (:)  => { $crate::lexer::token::Token::Operator($crate::lexer::token::Operator::Colon)     };

    ("(") => { $crate::lexer::token::Token::Delimiter($crate::lexer::token::Delimiter::LParen)  };
    (")") => { $crate::lexer::token::Token::Delimiter($crate::lexer::token::Delimiter::RParen)  };
    ("[") => { $crate::lexer::token::Token::Delimiter($crate::lexer::token::Delimiter::LSquare) };
    ("]") => { $crate::lexer::token::Token::Delimiter($crate::lexer::token::Delimiter::RSquare) };
    ("{") => { $crate::lexer::token::Token::Delimiter($crate::lexer::token::Delimiter::LCurly)  };
    ("}") => { $crate::lexer::token::Token::Delimiter($crate::lexer::token::Delimiter::RCurly)  };

    (;) => { $crate::lexer::token::Token::LineSep };
}
#[doc(inline)]
pub use token;

impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Ident(s)      => f.write_str(s),
            Token::Numeric(n)    => f.write_str(n),
            Token::Str(s)        => write!(f, "{:?}", s),
            Token::Keyword(kw)   => Display::fmt(kw, f),
            Token::Operator(op)  => Display::fmt(op, f),
            Token::Delimiter(de) => Display::fmt(de, f),
            Token::LineSep       => f.write_str(";"),
            Token::Eof           => f.write_str("fin de fichier"),
        }
    }
}
