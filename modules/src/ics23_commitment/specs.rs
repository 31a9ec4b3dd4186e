use ics23::ProofSpec;

/// The proof specs a chain commits its state with, innermost store first.
///
/// Cosmos chains commit each module store as an IAVL tree and the set of module store roots as
/// a simple Merkle tree, so the default is `[iavl_spec, tendermint_spec]`.
#[derive(Clone, Debug, PartialEq)]
pub struct ProofSpecs {
    specs: Vec<ProofSpec>,
}

impl ProofSpecs {
    pub fn cosmos() -> Self {
        Self {
            specs: vec![ics23::iavl_spec(), ics23::tendermint_spec()],
        }
    }

    /// Spec of the module stores (key/value inside one store).
    pub fn store_spec(&self) -> &ProofSpec {
        &self.specs[0]
    }

    /// Spec of the multi-store (store root inside the application hash).
    pub fn multistore_spec(&self) -> &ProofSpec {
        &self.specs[self.specs.len() - 1]
    }
}

impl Default for ProofSpecs {
    fn default() -> Self {
        Self::cosmos()
    }
}

pub(crate) fn is_iavl_spec(spec: &ProofSpec) -> bool {
    let iavl = ics23::iavl_spec();
    spec.leaf_spec == iavl.leaf_spec && spec.inner_spec == iavl.inner_spec
}
