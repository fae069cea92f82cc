//! Code generated by `tonic-build` from `proto/registry/v1/registry.proto`

#![allow(clippy::all)]

tonic::include_proto!("registry.v1");
