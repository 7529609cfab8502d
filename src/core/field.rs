//! Component-major field variable storage.

use crate::core::traits::FieldVariable;
use crate::error::FiberError;

/// Field variable with `n_components` blocks of `n_dofs` values each.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentField {
    n_dofs: usize,
    components: Vec<Vec<f64>>,
}

impl ComponentField {
    pub fn new(n_components: usize, n_dofs: usize) -> Self {
        Self { n_dofs, components: vec![vec![0.0; n_dofs]; n_components] }
    }

    /// Builds a field from per-component values; all components must have the same length.
    pub fn from_components(components: Vec<Vec<f64>>) -> Result<Self, FiberError> {
        let n_dofs = components.first().map_or(0, Vec::len);
        if let Some(c) = components.iter().position(|c| c.len() != n_dofs) {
            return Err(FiberError::Field(format!(
                "component {} has {} values, expected {}", c, components[c].len(), n_dofs
            )));
        }
        Ok(Self { n_dofs, components })
    }

    /// Appends a component initialized to `value`; returns its index.
    pub fn add_component(&mut self, value: f64) -> usize {
        self.components.push(vec![value; self.n_dofs]);
        self.components.len() - 1
    }

    pub fn component(&self, component: usize) -> Option<&[f64]> {
        self.components.get(component).map(Vec::as_slice)
    }

    fn component_mut(&mut self, component: usize) -> Result<&mut Vec<f64>, FiberError> {
        let n = self.components.len();
        self.components
            .get_mut(component)
            .ok_or_else(|| FiberError::Field(format!("component {} out of range ({} components)", component, n)))
    }
}

impl FieldVariable for ComponentField {
    fn n_components(&self) -> usize { self.components.len() }
    fn n_dofs_local_without_ghosts(&self) -> usize { self.n_dofs }

    fn get_values_without_ghosts(&self, component: usize, values: &mut Vec<f64>) -> Result<(), FiberError> {
        let src = self.component(component).ok_or_else(|| {
            FiberError::Field(format!("component {} out of range ({} components)", component, self.components.len()))
        })?;
        values.clear();
        values.extend_from_slice(src);
        Ok(())
    }

    fn set_values_without_ghosts(
        &mut self,
        component: usize,
        dof_nos_local: &[usize],
        values: &[f64],
    ) -> Result<(), FiberError> {
        if dof_nos_local.len() != values.len() {
            return Err(FiberError::Field(format!(
                "{} dof numbers for {} values", dof_nos_local.len(), values.len()
            )));
        }
        let n_dofs = self.n_dofs;
        let dst = self.component_mut(component)?;
        for (&dof, &v) in dof_nos_local.iter().zip(values) {
            *dst.get_mut(dof).ok_or_else(|| {
                FiberError::Field(format!("local dof {} out of range ({} dofs)", dof, n_dofs))
            })? = v;
        }
        Ok(())
    }
}
