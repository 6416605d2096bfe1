use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use crate::ast::ExprId;
use crate::interner::{Interner, Symbol};
use crate::token::TokenKind;

/// Session-wide state shared by the scanner, the parser and the evaluator.
///
/// The context anchors the string interner, maps reserved words to their token kinds and hands
/// out expression ids.  Ids must stay unique for the whole session: the hop distances computed
/// for a function body parsed from one REPL line are looked up again when that function is
/// called from a later line.
#[derive(Debug)]
pub struct Context {
    interner: RefCell<Interner>,
    keywords: HashMap<Symbol, TokenKind>,
    next_expr_id: Cell<u32>,
}

impl Context {
    /// Creates a new context.
    ///
    /// Returns a Rc because the context is shared between various data structures.
    pub fn new() -> Rc<Self> {
        let mut interner = Interner::new();
        let keywords = KEYWORDS
            .iter()
            .map(|&(name, kind)| (interner.symbol(name), kind))
            .collect();

        Rc::new(Context {
            interner: RefCell::new(interner),
            keywords,
            next_expr_id: Cell::new(0),
        })
    }

    /// Intern the given string if needed and return its associated symbol.
    pub fn symbol(&self, name: &str) -> Symbol {
        self.interner.borrow_mut().symbol(name)
    }

    /// Return the token kind associated with the given symbol if it is a reserved word.
    pub fn keyword(&self, sym: &Symbol) -> Option<TokenKind> {
        self.keywords.get(sym).copied()
    }

    /// Hand out a fresh id for a variable reference or assignment node.
    pub fn next_expr_id(&self) -> ExprId {
        let id = self.next_expr_id.get();
        self.next_expr_id.set(id + 1);
        ExprId(id)
    }
}

const KEYWORDS: [(&str, TokenKind); 16] = [
    ("and", TokenKind::And),
    ("class", TokenKind::Class),
    ("else", TokenKind::Else),
    ("false", TokenKind::False),
    ("for", TokenKind::For),
    ("fun", TokenKind::Fun),
    ("if", TokenKind::If),
    ("nil", TokenKind::Nil),
    ("or", TokenKind::Or),
    ("print", TokenKind::Print),
    ("return", TokenKind::Return),
    ("super", TokenKind::Super),
    ("this", TokenKind::This),
    ("true", TokenKind::True),
    ("var", TokenKind::Var),
    ("while", TokenKind::While),
];
