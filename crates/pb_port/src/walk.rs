//! Depth-first traversal of carrier fields.
//!
//! Flattened fields are not visited themselves: the walker enters the
//! embedded carrier, visits its fields, and exits again. Visitors that need
//! the index path of each field keep an [`IndexPath`] in step with the
//! callbacks.

use core::any::TypeId;

use crate::{FieldInfo, PortError, StructInfo};

/// Callbacks for [`walk_struct`].
pub trait StructVisitor {
    fn visit_field(&mut self, field: &'static FieldInfo) -> Result<(), PortError>;

    fn enter_embedded(&mut self, field: &'static FieldInfo) -> Result<(), PortError> {
        let _ = field;
        Ok(())
    }

    fn exit_embedded(&mut self, field: &'static FieldInfo) -> Result<(), PortError> {
        let _ = field;
        Ok(())
    }
}

/// Walks the fields of `info` in declaration order.
///
/// Fails with [`PortError::RecursiveStruct`] when a carrier embeds itself,
/// directly or through other embedded carriers.
pub fn walk_struct(info: &'static StructInfo, visitor: &mut dyn StructVisitor) -> Result<(), PortError> {
    let mut active = Vec::new();
    walk(info, visitor, &mut active)
}

fn walk(
    info: &'static StructInfo,
    visitor: &mut dyn StructVisitor,
    active: &mut Vec<TypeId>,
) -> Result<(), PortError> {
    if active.contains(&info.type_id()) {
        return Err(PortError::RecursiveStruct {
            type_name: info.type_name(),
        });
    }
    active.push(info.type_id());

    for field in info.fields() {
        match field.embedded_info() {
            Some(embedded) => {
                visitor.enter_embedded(field)?;
                walk(embedded, visitor, active)?;
                visitor.exit_embedded(field)?;
            }
            None => visitor.visit_field(field)?,
        }
    }

    active.pop();
    Ok(())
}

// -----------------------------------------------------------------------------
// IndexPath

/// Index bookkeeping for visitors.
///
/// Call [`advance`](Self::advance) after each visited field,
/// [`push`](Self::push) when entering an embedded carrier and
/// [`pop`](Self::pop) when leaving it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexPath(Vec<usize>);

impl IndexPath {
    pub fn new() -> Self {
        Self(vec![0])
    }

    /// Path of the field being visited.
    #[inline]
    pub fn current(&self) -> &[usize] {
        &self.0
    }

    pub fn advance(&mut self) {
        if let Some(last) = self.0.last_mut() {
            *last += 1;
        }
    }

    pub fn push(&mut self) {
        self.0.push(0);
    }

    /// Leaves an embedded carrier and steps past the field that held it.
    pub fn pop(&mut self) {
        self.0.pop();
        self.advance();
    }
}

impl Default for IndexPath {
    fn default() -> Self {
        Self::new()
    }
}

/// Collects every leaf field with its index path.
struct LeafCollector {
    path: IndexPath,
    leaves: Vec<(Vec<usize>, &'static FieldInfo)>,
}

impl StructVisitor for LeafCollector {
    fn visit_field(&mut self, field: &'static FieldInfo) -> Result<(), PortError> {
        self.leaves.push((self.path.current().to_vec(), field));
        self.path.advance();
        Ok(())
    }

    fn enter_embedded(&mut self, _: &'static FieldInfo) -> Result<(), PortError> {
        self.path.push();
        Ok(())
    }

    fn exit_embedded(&mut self, _: &'static FieldInfo) -> Result<(), PortError> {
        self.path.pop();
        Ok(())
    }
}

/// The leaf fields of `info` with their index paths, in walk order.
pub fn leaf_fields(info: &'static StructInfo) -> Result<Vec<(Vec<usize>, &'static FieldInfo)>, PortError> {
    let mut collector = LeafCollector {
        path: IndexPath::new(),
        leaves: Vec::new(),
    };
    walk_struct(info, &mut collector)?;
    Ok(collector.leaves)
}

// -----------------------------------------------------------------------------
// Tests
