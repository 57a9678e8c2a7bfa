use crate::error::{Error, Result};
use crate::keccak::keccak256;
use crate::keys::Signature;
use crate::spend::request::SpendRequest;
use crate::wire::types::Writer;

fn check_shape(req: &SpendRequest) -> Result<()> {
    if req.values.is_empty() || req.outputs.is_empty() {
        return Err(Error::DecodingError(
            "spend request must have at least one output".into(),
        ));
    }
    if req.values.len() != req.outputs.len() {
        return Err(Error::DecodingError(format!(
            "values length {} does not match outputs length {}",
            req.values.len(),
            req.outputs.len()
        )));
    }
    Ok(())
}

/// keccak256(input_id || witness_type_byte || Σ( value_i (32 BE) || output_encoding_i )) (§4.A).
pub fn sig_data(req: &SpendRequest) -> Result<[u8; 32]> {
    check_shape(req)?;
    let mut w = Writer::new();
    w.bytes32(&req.input_id);
    w.raw(&[req.witness.sig_hash_type_byte()]);
    for (value, output) in req.values.iter().zip(&req.outputs) {
        w.u256(value);
        w.raw(&output.encode());
    }
    Ok(keccak256(&w.into_vec()))
}

/// `(inputs_bytes, outputs_bytes)` for the on-chain `spend(inputs, outputs)`
/// call (§4.A). Fails `WitnessOverflow` if the witness bytes cannot fit in
/// the 16-bit length field.
pub fn wire_data(req: &SpendRequest, sig: &Signature) -> Result<(Vec<u8>, Vec<u8>)> {
    check_shape(req)?;

    let witness_bytes = req.witness.wire_bytes();
    let combined_len = witness_bytes.len() + sig.as_bytes().len();
    if combined_len > u16::MAX as usize {
        return Err(Error::WitnessOverflow(combined_len));
    }

    let mut inputs = Writer::new();
    inputs.bytes32(&req.input_id);
    inputs.raw(&[0u8; 14]);
    inputs.var_bytes(&witness_bytes);
    inputs.raw(sig.as_bytes());

    let mut outputs = Writer::new();
    for (value, output) in req.values.iter().zip(&req.outputs) {
        outputs.u256(value);
        outputs.raw(&output.encode());
    }

    Ok((inputs.into_vec(), outputs.into_vec()))
}

/// The 32-byte output IDs the contract will emit via `Create` events, in
/// output order (§4.A): `keccak256(keccak256(input_id) || output_encoding_i
/// || value_i (32 BE) || index_i (32 BE))`.
pub fn gen_output_ids(req: &SpendRequest) -> Result<Vec<[u8; 32]>> {
    check_shape(req)?;
    let normalized_input_id = keccak256(&req.input_id);

    let mut ids = Vec::with_capacity(req.outputs.len());
    for (index, (value, output)) in req.values.iter().zip(&req.outputs).enumerate() {
        let mut w = Writer::new();
        w.bytes32(&normalized_input_id);
        w.raw(&output.encode());
        w.u256(value);
        let index_u256 = ethers::types::U256::from(index as u64);
        w.u256(&index_u256);
        ids.push(keccak256(&w.into_vec()));
    }
    Ok(ids)
}
