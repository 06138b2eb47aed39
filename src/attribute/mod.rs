//! Registries of header attributes and key parameters.

#[macro_use]
mod registry;

mod header;
mod key_param;
mod validate;

pub use header::HeaderAttribute;
pub use key_param::{
    CommonParam, Curve, Ec2Param, KeyOp, KeyParam, KeyType, OkpParam,
    RsaParam, SymmetricParam,
};
