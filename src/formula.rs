//! Input formulas consumed by the compilation driver.
//!
//! This is intentionally a small model: the kernel only needs to know the
//! sort of a formula and to reach its operands. Smart constructors perform
//! the cheap constant simplifications (`a ∧ $true = a`, `a ∨ $true = $true`,
//! `¬¬a = a`) and flatten nested n-ary operators, which keeps the formulas
//! produced by [`to_formula`](crate::bdd::Bdd::to_formula) readable.

use std::collections::BTreeSet;
use std::fmt;

/// A named propositional variable.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Variable(String);

impl Variable {
    pub fn new(name: impl Into<String>) -> Self {
        Variable(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    pub fn pos(&self) -> Literal {
        Literal::new(self.clone(), true)
    }

    pub fn neg(&self) -> Literal {
        Literal::new(self.clone(), false)
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Variable {
    fn from(name: &str) -> Self {
        Variable::new(name)
    }
}

/// A variable together with a phase (`true` for the positive literal).
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Literal {
    variable: Variable,
    phase: bool,
}

impl Literal {
    pub fn new(variable: Variable, phase: bool) -> Self {
        Self { variable, phase }
    }

    pub fn variable(&self) -> &Variable {
        &self.variable
    }

    pub fn phase(&self) -> bool {
        self.phase
    }

    pub fn negate(&self) -> Self {
        Self::new(self.variable.clone(), !self.phase)
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.phase {
            write!(f, "{}", self.variable)
        } else {
            write!(f, "~{}", self.variable)
        }
    }
}

/// Comparison operator of a pseudo-Boolean constraint.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Comparator {
    Eq,
    Le,
    Lt,
    Ge,
    Gt,
}

impl Comparator {
    pub fn evaluate(self, lhs: i64, rhs: i64) -> bool {
        match self {
            Comparator::Eq => lhs == rhs,
            Comparator::Le => lhs <= rhs,
            Comparator::Lt => lhs < rhs,
            Comparator::Ge => lhs >= rhs,
            Comparator::Gt => lhs > rhs,
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Comparator::Eq => "=",
            Comparator::Le => "<=",
            Comparator::Lt => "<",
            Comparator::Ge => ">=",
            Comparator::Gt => ">",
        };
        write!(f, "{}", s)
    }
}

/// `Σ coefficients[i] · literals[i]  comparator  rhs`, where a literal counts 1 when true.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct PbConstraint {
    pub literals: Vec<Literal>,
    pub coefficients: Vec<i64>,
    pub comparator: Comparator,
    pub rhs: i64,
}

impl PbConstraint {
    pub fn new(literals: Vec<Literal>, coefficients: Vec<i64>, comparator: Comparator, rhs: i64) -> Self {
        assert_eq!(
            literals.len(),
            coefficients.len(),
            "Pseudo-Boolean constraint needs one coefficient per literal"
        );
        Self {
            literals,
            coefficients,
            comparator,
            rhs,
        }
    }

    /// Evaluates the constraint under a total assignment of its literals.
    pub fn evaluate(&self, value_of: impl Fn(&Variable) -> bool) -> bool {
        let lhs: i64 = self
            .literals
            .iter()
            .zip(&self.coefficients)
            .filter(|(lit, _)| value_of(lit.variable()) == lit.phase())
            .map(|(_, &c)| c)
            .sum();
        self.comparator.evaluate(lhs, self.rhs)
    }
}

impl fmt::Display for PbConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (lit, c)) in self.literals.iter().zip(&self.coefficients).enumerate() {
            if i > 0 {
                write!(f, " + ")?;
            }
            if *c == 1 {
                write!(f, "{}", lit)?;
            } else {
                write!(f, "{}*{}", c, lit)?;
            }
        }
        write!(f, " {} {}", self.comparator, self.rhs)
    }
}

/// The sort of a formula, as seen by the compilation driver.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum FormulaSort {
    False,
    True,
    Literal,
    Not,
    And,
    Or,
    Impl,
    Equiv,
    Cc,
    Pbc,
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum Formula {
    False,
    True,
    Lit(Literal),
    Not(Box<Formula>),
    And(Vec<Formula>),
    Or(Vec<Formula>),
    Impl(Box<Formula>, Box<Formula>),
    Equiv(Box<Formula>, Box<Formula>),
    /// Cardinality constraint: a constraint whose coefficients are all 1.
    Cc(PbConstraint),
    Pbc(PbConstraint),
}

impl Formula {
    pub fn constant(value: bool) -> Self {
        if value {
            Formula::True
        } else {
            Formula::False
        }
    }

    pub fn var(name: impl Into<String>) -> Self {
        Formula::Lit(Variable::new(name).pos())
    }

    pub fn lit(literal: Literal) -> Self {
        Formula::Lit(literal)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(operand: Formula) -> Self {
        match operand {
            Formula::False => Formula::True,
            Formula::True => Formula::False,
            Formula::Lit(lit) => Formula::Lit(lit.negate()),
            Formula::Not(inner) => *inner,
            other => Formula::Not(Box::new(other)),
        }
    }

    pub fn and(operands: impl IntoIterator<Item = Formula>) -> Self {
        let mut ops = Vec::new();
        for op in operands {
            match op {
                Formula::True => {}
                Formula::False => return Formula::False,
                Formula::And(inner) => ops.extend(inner),
                other => ops.push(other),
            }
        }
        match ops.len() {
            0 => Formula::True,
            1 => ops.remove(0),
            _ => Formula::And(ops),
        }
    }

    pub fn or(operands: impl IntoIterator<Item = Formula>) -> Self {
        let mut ops = Vec::new();
        for op in operands {
            match op {
                Formula::False => {}
                Formula::True => return Formula::True,
                Formula::Or(inner) => ops.extend(inner),
                other => ops.push(other),
            }
        }
        match ops.len() {
            0 => Formula::False,
            1 => ops.remove(0),
            _ => Formula::Or(ops),
        }
    }

    pub fn implies(lhs: Formula, rhs: Formula) -> Self {
        match (lhs, rhs) {
            (Formula::False, _) | (_, Formula::True) => Formula::True,
            (Formula::True, rhs) => rhs,
            (lhs, Formula::False) => Formula::not(lhs),
            (lhs, rhs) => Formula::Impl(Box::new(lhs), Box::new(rhs)),
        }
    }

    pub fn equiv(lhs: Formula, rhs: Formula) -> Self {
        match (lhs, rhs) {
            (Formula::True, other) | (other, Formula::True) => other,
            (Formula::False, other) | (other, Formula::False) => Formula::not(other),
            (lhs, rhs) => Formula::Equiv(Box::new(lhs), Box::new(rhs)),
        }
    }

    /// Cardinality constraint over positive variables.
    pub fn cc(variables: impl IntoIterator<Item = Variable>, comparator: Comparator, rhs: i64) -> Self {
        let literals: Vec<Literal> = variables.into_iter().map(|v| v.pos()).collect();
        let coefficients = vec![1; literals.len()];
        Formula::Cc(PbConstraint::new(literals, coefficients, comparator, rhs))
    }

    /// `Σ variables = 1`.
    pub fn exactly_one(variables: impl IntoIterator<Item = Variable>) -> Self {
        Formula::cc(variables, Comparator::Eq, 1)
    }

    /// `Σ variables <= 1`.
    pub fn at_most_one(variables: impl IntoIterator<Item = Variable>) -> Self {
        Formula::cc(variables, Comparator::Le, 1)
    }

    pub fn pbc(literals: Vec<Literal>, coefficients: Vec<i64>, comparator: Comparator, rhs: i64) -> Self {
        Formula::Pbc(PbConstraint::new(literals, coefficients, comparator, rhs))
    }

    pub fn sort(&self) -> FormulaSort {
        match self {
            Formula::False => FormulaSort::False,
            Formula::True => FormulaSort::True,
            Formula::Lit(_) => FormulaSort::Literal,
            Formula::Not(_) => FormulaSort::Not,
            Formula::And(_) => FormulaSort::And,
            Formula::Or(_) => FormulaSort::Or,
            Formula::Impl(..) => FormulaSort::Impl,
            Formula::Equiv(..) => FormulaSort::Equiv,
            Formula::Cc(_) => FormulaSort::Cc,
            Formula::Pbc(_) => FormulaSort::Pbc,
        }
    }

    /// Direct sub-formulas (constraints have none).
    pub fn operands(&self) -> Vec<&Formula> {
        match self {
            Formula::Not(op) => vec![op],
            Formula::And(ops) | Formula::Or(ops) => ops.iter().collect(),
            Formula::Impl(l, r) | Formula::Equiv(l, r) => vec![l, r],
            _ => Vec::new(),
        }
    }

    /// Calls `f` for every literal occurrence, in depth-first order.
    pub fn for_each_literal(&self, f: &mut impl FnMut(&Literal)) {
        match self {
            Formula::Lit(lit) => f(lit),
            Formula::Cc(c) | Formula::Pbc(c) => c.literals.iter().for_each(|lit| f(lit)),
            other => other.operands().into_iter().for_each(|op| op.for_each_literal(f)),
        }
    }

    pub fn variables(&self) -> BTreeSet<Variable> {
        let mut vars = BTreeSet::new();
        self.for_each_literal(&mut |lit| {
            vars.insert(lit.variable().clone());
        });
        vars
    }

    /// Evaluates the formula under an assignment given as a predicate.
    pub fn evaluate(&self, value_of: &impl Fn(&Variable) -> bool) -> bool {
        match self {
            Formula::False => false,
            Formula::True => true,
            Formula::Lit(lit) => value_of(lit.variable()) == lit.phase(),
            Formula::Not(op) => !op.evaluate(value_of),
            Formula::And(ops) => ops.iter().all(|op| op.evaluate(value_of)),
            Formula::Or(ops) => ops.iter().any(|op| op.evaluate(value_of)),
            Formula::Impl(l, r) => !l.evaluate(value_of) || r.evaluate(value_of),
            Formula::Equiv(l, r) => l.evaluate(value_of) == r.evaluate(value_of),
            Formula::Cc(c) | Formula::Pbc(c) => c.evaluate(value_of),
        }
    }

    /// Whether the formula is a conjunction of clauses of literals.
    pub fn is_cnf(&self) -> bool {
        fn is_clause(f: &Formula) -> bool {
            match f {
                Formula::Lit(_) | Formula::False => true,
                Formula::Or(ops) => ops.iter().all(|op| matches!(op, Formula::Lit(_))),
                _ => false,
            }
        }
        match self {
            Formula::True => true,
            Formula::And(ops) => ops.iter().all(is_clause),
            other => is_clause(other),
        }
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(f: &mut fmt::Formatter<'_>, ops: &[Formula], sep: &str) -> fmt::Result {
            write!(f, "(")?;
            for (i, op) in ops.iter().enumerate() {
                if i > 0 {
                    write!(f, " {} ", sep)?;
                }
                write!(f, "{}", op)?;
            }
            write!(f, ")")
        }

        match self {
            Formula::False => write!(f, "$false"),
            Formula::True => write!(f, "$true"),
            Formula::Lit(lit) => write!(f, "{}", lit),
            Formula::Not(op) => write!(f, "~{}", op),
            Formula::And(ops) => join(f, ops, "&"),
            Formula::Or(ops) => join(f, ops, "|"),
            Formula::Impl(l, r) => write!(f, "({} => {})", l, r),
            Formula::Equiv(l, r) => write!(f, "({} <=> {})", l, r),
            Formula::Cc(c) | Formula::Pbc(c) => write!(f, "{}", c),
        }
    }
}
