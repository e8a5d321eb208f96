// Domain layer: object, index and ignore formats plus the storage port.
// Pure byte-level codecs; filesystem access lives in core/ and adapters/.

pub mod ignore;
pub mod index;
pub mod kvlm;
pub mod model;
pub mod ports;
pub mod tree;
