use tablet_core::{schema::ModelId, stmt::Expr};

/// Index of a plan variable. A variable holds one stored row, keyed by
/// column, or nothing.
pub(crate) type VarId = usize;

/// The statements of one mutation, in execution order.
///
/// Expressions reference rows produced by earlier steps with
/// [`Expr::Arg`]; they are resolved when the step runs.
#[derive(Debug, Default)]
pub(crate) struct Plan {
    pub(crate) steps: Vec<Step>,

    /// Number of variables the plan uses
    pub(crate) vars: usize,
}

#[derive(Debug)]
pub(crate) enum Step {
    Find(Find),
    Insert(Insert),
    Update(Update),
    Delete(Delete),
    Link(Link),
    Branch(Branch),
}

/// Load at most one row into `var`.
#[derive(Debug)]
pub(crate) struct Find {
    pub(crate) var: VarId,
    pub(crate) model: ModelId,
    pub(crate) filter: Expr,

    /// Fail with "record not found" instead of leaving `var` empty
    pub(crate) required: bool,
}

/// Insert one row, then load it back into `var`.
#[derive(Debug)]
pub(crate) struct Insert {
    pub(crate) var: VarId,
    pub(crate) model: ModelId,
    pub(crate) values: Vec<(String, Expr)>,
}

#[derive(Debug)]
pub(crate) struct Update {
    pub(crate) model: ModelId,
    pub(crate) filter: Expr,
    pub(crate) assignments: Vec<(String, Expr)>,
}

#[derive(Debug)]
pub(crate) struct Delete {
    pub(crate) model: ModelId,
    pub(crate) filter: Expr,
}

/// Insert a junction row unless one already links the same pair.
#[derive(Debug)]
pub(crate) struct Link {
    pub(crate) junction: ModelId,
    pub(crate) values: [(String, Expr); 2],
}

/// Run `present` if `var` holds a row, `absent` otherwise.
#[derive(Debug)]
pub(crate) struct Branch {
    pub(crate) var: VarId,
    pub(crate) present: Vec<Step>,
    pub(crate) absent: Vec<Step>,
}

impl Step {
    /// Short name used in traces and tests.
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Step::Find(_) => "find",
            Step::Insert(_) => "insert",
            Step::Update(_) => "update",
            Step::Delete(_) => "delete",
            Step::Link(_) => "link",
            Step::Branch(_) => "branch",
        }
    }
}

impl From<Find> for Step {
    fn from(value: Find) -> Self {
        Step::Find(value)
    }
}

impl From<Insert> for Step {
    fn from(value: Insert) -> Self {
        Step::Insert(value)
    }
}

impl From<Update> for Step {
    fn from(value: Update) -> Self {
        Step::Update(value)
    }
}

impl From<Delete> for Step {
    fn from(value: Delete) -> Self {
        Step::Delete(value)
    }
}

impl From<Link> for Step {
    fn from(value: Link) -> Self {
        Step::Link(value)
    }
}

impl From<Branch> for Step {
    fn from(value: Branch) -> Self {
        Step::Branch(value)
    }
}
