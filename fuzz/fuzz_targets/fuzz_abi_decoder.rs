#![no_main]

use libfuzzer_sys::fuzz_target;
use skynt_phi::source::abi::Interface;

fuzz_target!(|data: &[u8]| {
    // Return data is attacker-controlled: decoding and narrowing must fail
    // cleanly, never panic.
    let (Ok(admin), Ok(nft)) = (Interface::admin(), Interface::nft()) else {
        return;
    };
    if let Ok(out) = admin.decode("getPhiDetails", data) {
        for index in 0..4 {
            let _ = out.uint_array(index);
            let _ = out.uint(index);
        }
    }
    if let Ok(out) = nft.decode("getMetadata", data) {
        for index in 0..6 {
            let _ = out.uint(index);
            let _ = out.string(index);
        }
    }
    if let Ok(out) = nft.decode("ownerOf", data) {
        let _ = out.address(0);
    }
    let _ = nft.decode("getRarityTier", data).and_then(|out| out.string(0));
});
