//! Transcription of mathematical markup into linear text notation.
//!
//! MathML subtrees are first lowered into the closed [`MathNode`] grammar,
//! then transcribed by a pure function. The grammar is total: any node kind
//! it does not recognize becomes [`MathNode::Unknown`], whose transcription
//! is the concatenation of its children, so arbitrary input trees always
//! produce some output.

use crate::fragment::ContentFragment;

/// One node of the math transcription grammar.
#[derive(Debug, Clone, PartialEq)]
pub enum MathNode {
    /// Ordered children transcribed back to back.
    Sequence(Vec<MathNode>),
    /// Square root of the inner expression.
    Sqrt(Box<MathNode>),
    /// Numerator over denominator.
    Fraction(Box<MathNode>, Box<MathNode>),
    /// Base raised to an exponent.
    Superscript(Box<MathNode>, Box<MathNode>),
    /// Base with an index.
    Subscript(Box<MathNode>, Box<MathNode>),
    /// Literal text: identifiers, numbers, operators.
    Leaf(String),
    /// Unrecognized node kind; children pass through.
    Unknown(Vec<MathNode>),
}

/// Transcribe a math tree into linear notation.
pub fn transcribe(node: &MathNode) -> String {
    match node {
        MathNode::Sequence(children) | MathNode::Unknown(children) => {
            children.iter().map(transcribe).collect()
        }
        MathNode::Sqrt(inner) => format!("√({})", transcribe(inner)),
        MathNode::Fraction(num, den) => {
            format!("({})/({})", transcribe(num), transcribe(den))
        }
        MathNode::Superscript(base, exp) => {
            format!("{}^({})", transcribe(base), transcribe(exp))
        }
        MathNode::Subscript(base, idx) => {
            format!("{}_({})", transcribe(base), transcribe(idx))
        }
        MathNode::Leaf(text) => text.clone(),
    }
}

/// Lower a `<math>` element subtree into the grammar.
pub fn from_fragment(fragment: &ContentFragment) -> MathNode {
    match fragment {
        ContentFragment::Text(t) => MathNode::Leaf(t.clone()),
        ContentFragment::Comment(_) => MathNode::Leaf(String::new()),
        ContentFragment::Element { tag, children, .. } => match tag.as_str() {
            "math" | "mrow" => MathNode::Sequence(lower_children(children)),
            "msqrt" => MathNode::Sqrt(Box::new(MathNode::Sequence(lower_children(children)))),
            "mfrac" => {
                // Fewer than two element children transcribes to empty.
                let elems: Vec<&ContentFragment> = children
                    .iter()
                    .filter(|c| matches!(c, ContentFragment::Element { .. }))
                    .collect();
                if elems.len() < 2 {
                    return MathNode::Leaf(String::new());
                }
                MathNode::Fraction(
                    Box::new(from_fragment(elems[0])),
                    Box::new(from_fragment(elems[1])),
                )
            }
            "msup" | "msub" => {
                let operands: Vec<&ContentFragment> = children
                    .iter()
                    .filter(|c| is_operand(c))
                    .collect();
                if operands.len() < 2 {
                    return MathNode::Leaf(String::new());
                }
                let base = Box::new(from_fragment(operands[0]));
                let script = Box::new(from_fragment(operands[1]));
                if tag == "msup" {
                    MathNode::Superscript(base, script)
                } else {
                    MathNode::Subscript(base, script)
                }
            }
            "mi" | "mn" | "mo" => MathNode::Leaf(fragment.text_content()),
            _ => MathNode::Unknown(lower_children(children)),
        },
    }
}

/// Whether a child participates as a math operand: elements and
/// non-whitespace text count; formatting whitespace between tags does not.
fn is_operand(fragment: &ContentFragment) -> bool {
    match fragment {
        ContentFragment::Element { .. } => true,
        ContentFragment::Text(t) => !t.trim().is_empty(),
        ContentFragment::Comment(_) => false,
    }
}

fn lower_children(children: &[ContentFragment]) -> Vec<MathNode> {
    children
        .iter()
        .filter(|c| is_operand(c))
        .map(from_fragment)
        .collect()
}
