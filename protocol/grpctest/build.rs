use tonic_build::manual::{Builder, Method, Service};

fn method(name: &str, route: &str) -> tonic_build::manual::MethodBuilder {
    Method::builder()
        .name(name)
        .route_name(route)
        .input_type("crate::proto::Request")
        .output_type("crate::proto::Response")
        .codec_path("tonic::codec::ProstCodec")
}

fn main() {
    let service = Service::builder()
        .name("GrpcTest")
        .package("grpctest")
        .method(method("unary", "Unary").build())
        .method(method("client_stream", "ClientStream").client_streaming().build())
        .method(method("server_stream", "ServerStream").server_streaming().build())
        .method(
            method("bi_directional_stream", "BiDirectionalStream")
                .client_streaming()
                .server_streaming()
                .build(),
        )
        .build();

    Builder::new().compile(&[service]);
}
