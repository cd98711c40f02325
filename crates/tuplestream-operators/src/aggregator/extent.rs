//! `First` and `Last`: keep one representative row per group.
//!
//! Rows whose tuple equals a member of the optional ignore set are skipped.
//! Nothing is emitted for an empty or all-ignored group.

use std::marker::PhantomData;

use tuplestream_core::hash::{hash_tuples, Hash256};
use tuplestream_core::schema::Fields;
use tuplestream_core::types::{Tuple, TupleEntry};

use crate::traits::{Aggregator, OpError, Operation, OutputCollector};

/// Which qualifying row an extent keeps.
pub trait ExtentPolicy: Send + Sync + 'static {
    const NAME: &'static str;

    /// Whether a new qualifying row replaces what is stored.
    fn replaces(already_stored: bool) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeepFirst;

impl ExtentPolicy for KeepFirst {
    const NAME: &'static str = "first";

    // Arrival order within the group already reflects the upstream sort.
    fn replaces(already_stored: bool) -> bool {
        !already_stored
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeepLast;

impl ExtentPolicy for KeepLast {
    const NAME: &'static str = "last";

    fn replaces(_already_stored: bool) -> bool {
        true
    }
}

/// Emits the first qualifying row of each group.
pub type First = Extent<KeepFirst>;

/// Emits the last qualifying row of each group.
pub type Last = Extent<KeepLast>;

#[derive(Debug, Clone)]
pub struct Extent<P> {
    declared: Fields,
    ignore: Option<Vec<Tuple>>,
    _policy: PhantomData<P>,
}

/// Row buffer reused across groups; `stored` is the "no result yet" sentinel.
#[derive(Debug, Default)]
pub struct ExtentContext {
    row: Tuple,
    stored: bool,
}

impl ExtentContext {
    pub fn row(&self) -> Option<&Tuple> {
        self.stored.then_some(&self.row)
    }
}

impl<P: ExtentPolicy> Extent<P> {
    /// `declared` names the fields of the emitted row.
    pub fn new(declared: Fields) -> Self {
        Self {
            declared,
            ignore: None,
            _policy: PhantomData,
        }
    }

    /// Skip rows equal to any of `tuples`.
    pub fn with_ignore<I>(declared: Fields, tuples: I) -> Self
    where
        I: IntoIterator<Item = Tuple>,
    {
        let mut ignore: Vec<Tuple> = Vec::new();
        for t in tuples {
            if !ignore.iter().any(|kept| kept.same_as(&t)) {
                ignore.push(t);
            }
        }
        Self {
            declared,
            ignore: Some(ignore),
            _policy: PhantomData,
        }
    }

    fn is_ignored(&self, tuple: &Tuple) -> bool {
        self.ignore
            .as_ref()
            .is_some_and(|set| set.iter().any(|t| t.same_as(tuple)))
    }
}

impl<P: ExtentPolicy> Operation for Extent<P> {
    fn name(&self) -> &'static str {
        P::NAME
    }

    fn field_declaration(&self) -> &Fields {
        &self.declared
    }

    fn config_hash(&self) -> Hash256 {
        match &self.ignore {
            None => Hash256::default(),
            Some(set) => {
                // Order-insensitive: the ignore set is a set.
                let mut sorted: Vec<(String, &Tuple)> =
                    set.iter().map(|t| (format!("{t:?}"), t)).collect();
                sorted.sort_by(|a, b| a.0.cmp(&b.0));
                hash_tuples("ignore", sorted.into_iter().map(|(_, t)| t))
            }
        }
    }
}

impl<P: ExtentPolicy> Aggregator for Extent<P> {
    type Context = ExtentContext;

    fn new_context(&self) -> ExtentContext {
        ExtentContext::default()
    }

    fn start(&self, context: &mut ExtentContext, _group: &TupleEntry) -> Result<(), OpError> {
        context.stored = false;
        Ok(())
    }

    fn aggregate(
        &self,
        context: &mut ExtentContext,
        arguments: &TupleEntry,
    ) -> Result<(), OpError> {
        if self.is_ignored(&arguments.tuple) {
            return Ok(());
        }
        if P::replaces(context.stored) {
            context.row.clear();
            context.row.append(&arguments.tuple);
            context.stored = true;
        }
        Ok(())
    }

    fn complete(
        &self,
        context: &mut ExtentContext,
        _group: &TupleEntry,
        output: &mut dyn OutputCollector,
    ) -> Result<(), OpError> {
        if context.stored {
            output.collect(context.row.clone())?;
        }
        Ok(())
    }
}
