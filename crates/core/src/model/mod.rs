//! Editable structural model of one resolved type.
//!
//! A [`ClassModel`] wraps a fully decoded [`ClassNode`] and remembers where it
//! came from: the loading scope it was resolved in and whether it was parsed
//! from class-file bytes or assembled from a live type's reflected shape.
//! Every model owns its tree outright; resolving the same name twice yields
//! two models that can be edited independently.

use serde::Serialize;
use thiserror::Error;

use crate::classfile::{
    access, ClassFileError, ClassNode, ClassVersion, ConstantPool, FieldNode, MethodBody,
    MethodNode,
};
use crate::context::{LoadingScope, ReflectedClass};
use crate::names::TypeName;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("{0} was built from a live type and cannot be edited or re-encoded")]
    LiveTypeReadOnly(TypeName),
    #[error("field {name} already exists")]
    DuplicateField { name: String },
    #[error("method {name}{descriptor} already exists")]
    DuplicateMethod { name: String, descriptor: String },
    #[error("no field named {name}")]
    NoSuchField { name: String },
    #[error("no method {name}{descriptor}")]
    NoSuchMethod { name: String, descriptor: String },
    #[error("method {name}{descriptor} is abstract or native and cannot have a body")]
    BodilessMethod { name: String, descriptor: String },
    #[error(transparent)]
    Format(#[from] ClassFileError),
}

pub type ModelResult<T> = Result<T, ModelError>;

/// How a model's tree was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    /// Decoded from class-file bytes; complete and editable.
    Parsed,
    /// Assembled from reflection; declarations only, no bytecode.
    Live,
}

#[derive(Debug, Clone)]
pub struct ClassModel {
    node: ClassNode,
    scope: Option<LoadingScope>,
    provenance: Provenance,
}

impl ClassModel {
    pub fn from_parsed(node: ClassNode, scope: Option<LoadingScope>) -> Self {
        Self { node, scope, provenance: Provenance::Parsed }
    }

    /// Build a declarations-only model from a loaded type. Method bodies are
    /// absent because the runtime does not expose them.
    pub fn from_reflected(class: ReflectedClass, scope: Option<LoadingScope>) -> Self {
        let mut node = ClassNode::new(class.name, class.super_name);
        node.access = class.access;
        node.interfaces = class.interfaces;
        node.fields = class
            .fields
            .into_iter()
            .map(|member| FieldNode::new(member.access, member.name, member.descriptor))
            .collect();
        node.methods = class
            .methods
            .into_iter()
            .map(|member| MethodNode::new(member.access, member.name, member.descriptor, None))
            .collect();
        Self { node, scope, provenance: Provenance::Live }
    }

    pub fn name(&self) -> &TypeName {
        &self.node.name
    }

    pub fn super_name(&self) -> Option<&TypeName> {
        self.node.super_name.as_ref()
    }

    pub fn interfaces(&self) -> &[TypeName] {
        &self.node.interfaces
    }

    pub fn access(&self) -> u16 {
        self.node.access
    }

    pub fn is_interface(&self) -> bool {
        self.node.access & access::INTERFACE != 0
    }

    pub fn version(&self) -> ClassVersion {
        self.node.version
    }

    pub fn fields(&self) -> &[FieldNode] {
        &self.node.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldNode> {
        self.node.fields.iter().find(|field| field.name == name)
    }

    pub fn methods(&self) -> &[MethodNode] {
        &self.node.methods
    }

    pub fn method(&self, name: &str, descriptor: &str) -> Option<&MethodNode> {
        self.node.methods.iter().find(|m| m.name == name && m.descriptor == descriptor)
    }

    /// Method names in declaration order; overloads appear once per overload.
    pub fn method_names(&self) -> Vec<&str> {
        self.node.methods.iter().map(|m| m.name.as_str()).collect()
    }

    pub fn constants(&self) -> &ConstantPool {
        &self.node.constant_pool
    }

    pub fn scope(&self) -> Option<&LoadingScope> {
        self.scope.as_ref()
    }

    pub fn provenance(&self) -> Provenance {
        self.provenance
    }

    /// Underlying tree, read-only.
    pub fn node(&self) -> &ClassNode {
        &self.node
    }

    fn editable(&mut self) -> ModelResult<&mut ClassNode> {
        match self.provenance {
            Provenance::Parsed => Ok(&mut self.node),
            Provenance::Live => Err(ModelError::LiveTypeReadOnly(self.node.name.clone())),
        }
    }

    pub fn add_field(&mut self, field: FieldNode) -> ModelResult<()> {
        let node = self.editable()?;
        if node.fields.iter().any(|existing| existing.name == field.name) {
            return Err(ModelError::DuplicateField { name: field.name });
        }
        node.fields.push(field);
        Ok(())
    }

    pub fn remove_field(&mut self, name: &str) -> ModelResult<FieldNode> {
        let node = self.editable()?;
        let index = node
            .fields
            .iter()
            .position(|field| field.name == name)
            .ok_or_else(|| ModelError::NoSuchField { name: name.to_string() })?;
        Ok(node.fields.remove(index))
    }

    pub fn add_method(&mut self, mut method: MethodNode) -> ModelResult<()> {
        let node = self.editable()?;
        if node.methods.iter().any(|m| m.name == method.name && m.descriptor == method.descriptor) {
            return Err(ModelError::DuplicateMethod {
                name: method.name,
                descriptor: method.descriptor,
            });
        }
        if method.is_bodiless() && method.body.is_some() {
            return Err(ModelError::BodilessMethod {
                name: method.name,
                descriptor: method.descriptor,
            });
        }
        if let Some(body) = method.body.as_mut() {
            body.drop_offset_attributes();
        }
        node.methods.push(method);
        Ok(())
    }

    pub fn remove_method(&mut self, name: &str, descriptor: &str) -> ModelResult<MethodNode> {
        let node = self.editable()?;
        let index = method_index(node, name, descriptor)?;
        Ok(node.methods.remove(index))
    }

    /// Replace a method's bytecode, returning the previous body.
    pub fn set_method_body(
        &mut self,
        name: &str,
        descriptor: &str,
        mut body: MethodBody,
    ) -> ModelResult<Option<MethodBody>> {
        let node = self.editable()?;
        let index = method_index(node, name, descriptor)?;
        let method = &mut node.methods[index];
        if method.is_bodiless() {
            return Err(ModelError::BodilessMethod {
                name: method.name.clone(),
                descriptor: method.descriptor.clone(),
            });
        }
        body.drop_offset_attributes();
        Ok(method.body.replace(body))
    }

    /// Mutable access to an existing body. Line-number, local-variable and
    /// stack-map attributes are dropped up front since any edit invalidates
    /// them.
    pub fn method_body_mut(&mut self, name: &str, descriptor: &str) -> ModelResult<&mut MethodBody> {
        let node = self.editable()?;
        let index = method_index(node, name, descriptor)?;
        let method = &mut node.methods[index];
        let (name, descriptor) = (method.name.clone(), method.descriptor.clone());
        let body = method.body.as_mut().ok_or(ModelError::BodilessMethod { name, descriptor })?;
        body.drop_offset_attributes();
        Ok(body)
    }

    /// Returns `false` if the type already implements `interface`.
    pub fn add_interface(&mut self, interface: TypeName) -> ModelResult<bool> {
        let node = self.editable()?;
        if node.interfaces.contains(&interface) {
            return Ok(false);
        }
        node.interfaces.push(interface);
        Ok(true)
    }

    /// Constant pool for instructions that need new entries (`ldc`,
    /// `invokevirtual`, ...). The pool only grows, so existing indices stay
    /// valid.
    pub fn constants_mut(&mut self) -> ModelResult<&mut ConstantPool> {
        Ok(&mut self.editable()?.constant_pool)
    }

    pub fn to_bytes(&self) -> ModelResult<Vec<u8>> {
        if self.provenance == Provenance::Live {
            return Err(ModelError::LiveTypeReadOnly(self.node.name.clone()));
        }
        Ok(self.node.to_bytes()?)
    }

    pub fn summary(&self) -> ClassSummary {
        ClassSummary {
            name: self.node.name.java_name(),
            super_name: self.node.super_name.as_ref().map(TypeName::java_name),
            interfaces: self.node.interfaces.iter().map(TypeName::java_name).collect(),
            access: self.node.access,
            version: format!("{}.{}", self.node.version.major, self.node.version.minor),
            scope: self.scope.as_ref().map(|scope| scope.name().to_string()),
            provenance: self.provenance,
            fields: self
                .node
                .fields
                .iter()
                .map(|field| MemberSummary {
                    access: field.access,
                    name: field.name.clone(),
                    descriptor: field.descriptor.clone(),
                    instructions: None,
                })
                .collect(),
            methods: self
                .node
                .methods
                .iter()
                .map(|method| MemberSummary {
                    access: method.access,
                    name: method.name.clone(),
                    descriptor: method.descriptor.clone(),
                    instructions: method.body.as_ref().map(MethodBody::len),
                })
                .collect(),
        }
    }
}

fn method_index(node: &ClassNode, name: &str, descriptor: &str) -> ModelResult<usize> {
    node.methods
        .iter()
        .position(|m| m.name == name && m.descriptor == descriptor)
        .ok_or_else(|| ModelError::NoSuchMethod {
            name: name.to_string(),
            descriptor: descriptor.to_string(),
        })
}

/// Flattened, serializable view of a model for reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassSummary {
    pub name: String,
    pub super_name: Option<String>,
    pub interfaces: Vec<String>,
    pub access: u16,
    pub version: String,
    pub scope: Option<String>,
    pub provenance: Provenance,
    pub fields: Vec<MemberSummary>,
    pub methods: Vec<MemberSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberSummary {
    pub access: u16,
    pub name: String,
    pub descriptor: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<usize>,
}
