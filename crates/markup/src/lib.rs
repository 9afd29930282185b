// Image reference scanning and rewriting over rendered page markup.
//
// Pages ask for derivatives by appending a query to a local image path:
//
//   <img src="/assets/images/team/john.jpg?size=300x300&format=webp">
//   style="background-image: linear-gradient(...), url('/assets/images/hero.png?size=1920x1080')"
//
// `Scanner::scan` turns those into `TransformRequest`s; `Scanner::rewrite`
// replaces each one with the derivative's public URL. Both go through the same
// matcher in `reference`, so anything the scanner ignores the rewriter leaves
// untouched.

mod reference;
mod scanner;

pub use reference::{ImageReference, ReferenceKind, parse_request};
pub use scanner::Scanner;
