//! Call descriptors: how a node names its processing unit and parameters.
//!
//! A descriptor takes one of three shapes, mirroring how much the node
//! pins down:
//!
//! 1. [`CallDescriptor::Unit`] — invoke the unit with positional inputs
//!    only;
//! 2. [`CallDescriptor::WithParams`] — invoke with the given call
//!    parameters merged over the inputs;
//! 3. [`CallDescriptor::WithInit`] — build an instance from init
//!    parameters first, then invoke it. Valid only for constructible
//!    units; applying it to a plain invocable fails at execution time with
//!    an arity error naming the descriptor shape.
//!
//! The unit itself is referenced either directly ([`UnitRef::Invocable`],
//! [`UnitRef::Constructible`]) or by a dotted-path string resolved through
//! the unit registry once per invocation.

use std::fmt;
use std::sync::Arc;

use crate::traits::{Unit, UnitBuilder};
use crate::values::ParamMap;

/// Reference to a processing unit, direct or by registry path.
#[derive(Clone)]
pub enum UnitRef {
    Invocable(Arc<dyn Unit>),
    Constructible(Arc<dyn UnitBuilder>),
    Path(String),
}

impl UnitRef {
    pub fn invocable(unit: impl Unit + 'static) -> Self {
        UnitRef::Invocable(Arc::new(unit))
    }

    pub fn constructible(builder: impl UnitBuilder + 'static) -> Self {
        UnitRef::Constructible(Arc::new(builder))
    }

    pub fn path(path: impl Into<String>) -> Self {
        UnitRef::Path(path.into())
    }

    /// The unit name or dotted path, for logs and error context.
    pub fn describe(&self) -> String {
        match self {
            UnitRef::Invocable(unit) => unit.name().to_string(),
            UnitRef::Constructible(builder) => builder.name().to_string(),
            UnitRef::Path(path) => path.clone(),
        }
    }
}

impl fmt::Debug for UnitRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitRef::Invocable(unit) => write!(f, "Invocable({})", unit.name()),
            UnitRef::Constructible(builder) => write!(f, "Constructible({})", builder.name()),
            UnitRef::Path(path) => write!(f, "Path({})", path),
        }
    }
}

/// The three normative descriptor shapes. `None` parameter maps in the
/// init shape mean empty maps.
#[derive(Debug, Clone)]
pub enum CallDescriptor {
    Unit(UnitRef),
    WithParams(UnitRef, ParamMap),
    WithInit(UnitRef, Option<ParamMap>, Option<ParamMap>),
}

impl CallDescriptor {
    pub fn bare(unit: UnitRef) -> Self {
        CallDescriptor::Unit(unit)
    }

    pub fn with_params(unit: UnitRef, call_params: ParamMap) -> Self {
        CallDescriptor::WithParams(unit, call_params)
    }

    pub fn with_init(
        unit: UnitRef,
        init_params: Option<ParamMap>,
        call_params: Option<ParamMap>,
    ) -> Self {
        CallDescriptor::WithInit(unit, init_params, call_params)
    }

    pub fn unit_ref(&self) -> &UnitRef {
        match self {
            CallDescriptor::Unit(unit)
            | CallDescriptor::WithParams(unit, _)
            | CallDescriptor::WithInit(unit, _, _) => unit,
        }
    }

    /// Number of elements in the descriptor shape: 1, 2 or 3.
    pub fn arity(&self) -> usize {
        match self {
            CallDescriptor::Unit(_) => 1,
            CallDescriptor::WithParams(_, _) => 2,
            CallDescriptor::WithInit(_, _, _) => 3,
        }
    }

    pub fn init_params(&self) -> Option<&ParamMap> {
        match self {
            CallDescriptor::WithInit(_, init, _) => init.as_ref(),
            _ => None,
        }
    }

    pub fn call_params(&self) -> Option<&ParamMap> {
        match self {
            CallDescriptor::Unit(_) => None,
            CallDescriptor::WithParams(_, params) => Some(params),
            CallDescriptor::WithInit(_, _, params) => params.as_ref(),
        }
    }

    /// Compact rendering for logs and error messages, e.g. `concat/2`.
    pub fn summary(&self) -> String {
        format!("{}/{}", self.unit_ref().describe(), self.arity())
    }
}
